use tama::{
    constants::{HEADER_LENGTH, HEADER_MAGIC},
    Firmware, SpriteHeader,
};

use crate::err;

/// The raw header fields at an offset, whether or not they form a block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderReport {
    pub offset: usize,
    pub width: u8,
    pub height: u8,
    pub colors: u8,
    pub magic_ok: bool,
    pub bits_per_pixel: u8,
    pub header_size: usize,
    pub data_start: usize,
    pub data_len: usize,
    pub block_size: usize,
}

impl HeaderReport {
    pub fn read(bytes: &[u8], offset: usize) -> eyre::Result<Self> {
        let header_bytes = bytes.get(offset..).and_then(|rest| rest.get(..HEADER_LENGTH));

        let Some(&[width, height, colors, m0, m1, m2]) = header_bytes else {
            return err!("offset 0x{offset:X} is out of range");
        };

        let header = SpriteHeader {
            width,
            height,
            color_count: colors,
        };
        let header_size = HEADER_LENGTH + header.palette_len();

        Ok(Self {
            offset,
            width,
            height,
            colors,
            magic_ok: [m0, m1, m2] == HEADER_MAGIC,
            bits_per_pixel: header.bit_depth().bits(),
            header_size,
            data_start: offset + header_size,
            data_len: header.data_len(),
            block_size: header.block_size(),
        })
    }
}

pub fn inspect(firmware: &Firmware, offset: usize) -> eyre::Result<()> {
    let report = HeaderReport::read(firmware.bytes(), offset)?;

    println!("offset       0x{offset:X}");
    println!("width        {}", report.width);
    println!("height       {}", report.height);
    println!("colors       {}", report.colors);
    println!("magic_ok     {}", report.magic_ok);
    println!("bpp          {}", report.bits_per_pixel);
    println!("header_size  {}", report.header_size);
    println!("data_start   0x{:X}", report.data_start);
    println!("data_len     {}", report.data_len);
    println!("block_size   {}", report.block_size);

    match firmware.block_at(offset) {
        Ok(block) => {
            let listed = firmware.map().get(offset).is_some();
            println!(
                "valid block  yes (in scan map: {listed}, {} bytes of pixels)",
                block.data_len()
            );
        }
        Err(err) => println!("valid block  no ({err})"),
    }

    Ok(())
}
