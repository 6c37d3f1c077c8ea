use std::path::Path;

use eyre::eyre;

#[macro_export]
macro_rules! err {
    ($e: ident) => {{
        use eyre::eyre;

        Err(eyre!($e))
    }};

    ($format_string: literal) => {{
        use eyre::eyre;

        Err(eyre!($format_string))
    }};

    ($($arg:tt)*) => {{
        use eyre::eyre;

        Err(eyre!($($arg)*))
    }};
}

/// Accepts `0x45C040` style hex or plain decimal.
pub fn parse_offset(s: &str) -> eyre::Result<usize> {
    let s = s.trim().to_lowercase();

    let res = match s.strip_prefix("0x") {
        Some(hex) => usize::from_str_radix(hex, 16),
        None => s.parse::<usize>(),
    };

    res.map_err(|op| eyre!("invalid offset `{s}`: {op}"))
}

/// Loads any image the `image` crate can read as RGBA pixels.
pub fn load_rgba(path: &Path) -> eyre::Result<(Vec<u8>, (u32, u32))> {
    let img = image::open(path)
        .map_err(|op| eyre!("cannot open image `{}`: {op}", path.display()))?
        .into_rgba8();
    let dimensions = img.dimensions();

    Ok((img.into_raw(), dimensions))
}

pub fn block_file_name(offset: usize, ext: &str) -> String {
    format!("img_{offset:06X}.{ext}")
}
