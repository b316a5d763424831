use std::{error::Error as StdError, fmt, io::Cursor, str::FromStr};

use image::{imageops::FilterType, ImageFormat, RgbaImage};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TextureError {
    #[error("failed to decode atlas image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("{0} is block compressed, encode it with a TextureCompressor")]
    RequiresCompressor(TargetFormat),

    #[error("compressing atlas to {format} failed: {message}")]
    Compressor { format: TargetFormat, message: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Platform {
    Desktop,
    Android,
    Ios,
}

/// Pixel format the atlas texture is delivered in
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TargetFormat {
    #[default]
    Rgba32,
    Rgba4444,
    Rgb565,
    /// BC3
    Dxt5,
    Etc2Rgba8,
    PvrtcRgba4,
}

impl TargetFormat {
    pub const ALL: [TargetFormat; 6] = [
        TargetFormat::Rgba32,
        TargetFormat::Rgba4444,
        TargetFormat::Rgb565,
        TargetFormat::Dxt5,
        TargetFormat::Etc2Rgba8,
        TargetFormat::PvrtcRgba4,
    ];

    pub fn for_platform(platform: Platform) -> Self {
        match platform {
            Platform::Desktop => TargetFormat::Dxt5,
            Platform::Android => TargetFormat::Etc2Rgba8,
            Platform::Ios => TargetFormat::PvrtcRgba4,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            TargetFormat::Rgba32 => "rgba32",
            TargetFormat::Rgba4444 => "rgba4444",
            TargetFormat::Rgb565 => "rgb565",
            TargetFormat::Dxt5 => "dxt5",
            TargetFormat::Etc2Rgba8 => "etc2-rgba8",
            TargetFormat::PvrtcRgba4 => "pvrtc-rgba4",
        }
    }

    pub fn is_block_compressed(&self) -> bool {
        matches!(
            self,
            TargetFormat::Dxt5 | TargetFormat::Etc2Rgba8 | TargetFormat::PvrtcRgba4
        )
    }

    /// Texture dimensions this format can hold an image of the given size in
    /// 4x4 block formats need multiples of four, PVRTC a power of two square
    pub fn texture_size(&self, width: u32, height: u32) -> (u32, u32) {
        match self {
            TargetFormat::Dxt5 | TargetFormat::Etc2Rgba8 => {
                (width.next_multiple_of(4), height.next_multiple_of(4))
            }
            TargetFormat::PvrtcRgba4 => {
                let side = width.max(height).max(4).next_power_of_two();
                (side, side)
            }
            _ => (width, height),
        }
    }
}

impl fmt::Display for TargetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TargetFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TargetFormat::ALL
            .into_iter()
            .find(|format| format.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                let names: Vec<&str> = TargetFormat::ALL.iter().map(|f| f.name()).collect();
                format!("unknown texture format {s}, expected one of {}", names.join(", "))
            })
    }
}

/// Engine side block compression, the atlas is only ever handed over as RGBA
pub trait TextureCompressor {
    fn compress(
        &self,
        format: TargetFormat,
        image: &RgbaImage,
    ) -> Result<Vec<u8>, Box<dyn StdError + Send + Sync>>;
}

/// The decoded atlas, resampled to fit its target format
#[derive(Clone, Debug)]
pub struct AtlasTexture {
    pub format: TargetFormat,
    pub image: RgbaImage,
}

impl AtlasTexture {
    /// Decode the packer's atlas image; uvs are normalized so resampling keeps them valid
    pub fn decode(bytes: &[u8], format: TargetFormat) -> Result<Self, TextureError> {
        let image = image::load_from_memory(bytes)?.to_rgba8();
        let (width, height) = image.dimensions();
        let (target_width, target_height) = format.texture_size(width, height);
        let image = if (target_width, target_height) != (width, height) {
            log::info!(
                "Resampling atlas from {width}x{height} to {target_width}x{target_height} for {format}"
            );
            image::imageops::resize(&image, target_width, target_height, FilterType::Triangle)
        } else {
            image
        };
        Ok(Self { format, image })
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Pixel data in the target format, uncompressed formats only
    pub fn encode(&self) -> Result<Vec<u8>, TextureError> {
        match self.format {
            TargetFormat::Rgba32 => Ok(self.image.as_raw().clone()),
            TargetFormat::Rgba4444 => Ok(self.pack_16bit(|[r, g, b, a]| {
                let [r, g, b, a] = [r, g, b, a].map(|channel| u16::from(channel >> 4));
                r << 12 | g << 8 | b << 4 | a
            })),
            TargetFormat::Rgb565 => Ok(self.pack_16bit(|[r, g, b, _]| {
                u16::from(r >> 3) << 11 | u16::from(g >> 2) << 5 | u16::from(b >> 3)
            })),
            format => Err(TextureError::RequiresCompressor(format)),
        }
    }

    /// Pixel data in the target format, block formats go through `compressor`
    pub fn encode_with(&self, compressor: &dyn TextureCompressor) -> Result<Vec<u8>, TextureError> {
        if !self.format.is_block_compressed() {
            return self.encode();
        }
        compressor
            .compress(self.format, &self.image)
            .map_err(|error| TextureError::Compressor {
                format: self.format,
                message: error.to_string(),
            })
    }

    pub fn to_png(&self) -> Result<Vec<u8>, TextureError> {
        let mut bytes = Cursor::new(Vec::new());
        self.image.write_to(&mut bytes, ImageFormat::Png)?;
        Ok(bytes.into_inner())
    }

    fn pack_16bit(&self, pack: impl Fn([u8; 4]) -> u16) -> Vec<u8> {
        self.image
            .pixels()
            .flat_map(|pixel| pack(pixel.0).to_le_bytes())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use image::Rgba;

    use super::*;

    fn png(width: u32, height: u32, color: [u8; 4]) -> Vec<u8> {
        let image = RgbaImage::from_pixel(width, height, Rgba(color));
        AtlasTexture {
            format: TargetFormat::Rgba32,
            image,
        }
        .to_png()
        .unwrap()
    }

    struct Echo;

    impl TextureCompressor for Echo {
        fn compress(
            &self,
            format: TargetFormat,
            image: &RgbaImage,
        ) -> Result<Vec<u8>, Box<dyn StdError + Send + Sync>> {
            if format == TargetFormat::PvrtcRgba4 {
                return Err("no pvrtc here".into());
            }
            Ok(vec![image.width() as u8, image.height() as u8])
        }
    }

    #[test]
    fn platform_formats() {
        assert_eq!(TargetFormat::for_platform(Platform::Desktop), TargetFormat::Dxt5);
        assert_eq!(TargetFormat::for_platform(Platform::Android), TargetFormat::Etc2Rgba8);
        assert_eq!(TargetFormat::for_platform(Platform::Ios), TargetFormat::PvrtcRgba4);
    }

    #[test]
    fn format_names_round_trip_through_from_str() {
        for format in TargetFormat::ALL {
            assert_eq!(format.name().parse::<TargetFormat>(), Ok(format));
        }
        assert!("bc7".parse::<TargetFormat>().is_err());
    }

    #[test]
    fn block_formats_round_up_size() {
        assert_eq!(TargetFormat::Dxt5.texture_size(30, 17), (32, 20));
        assert_eq!(TargetFormat::Etc2Rgba8.texture_size(32, 32), (32, 32));
        assert_eq!(TargetFormat::PvrtcRgba4.texture_size(300, 100), (512, 512));
        assert_eq!(TargetFormat::Rgba32.texture_size(30, 17), (30, 17));
    }

    #[test]
    fn decode_keeps_uncompressed_size() {
        let texture = AtlasTexture::decode(&png(6, 3, [255, 0, 0, 255]), TargetFormat::Rgba32).unwrap();
        assert_eq!((texture.width(), texture.height()), (6, 3));
        assert_eq!(texture.encode().unwrap().len(), 6 * 3 * 4);
    }

    #[test]
    fn decode_resamples_for_block_formats() {
        let texture = AtlasTexture::decode(&png(6, 3, [0, 0, 255, 255]), TargetFormat::Dxt5).unwrap();
        assert_eq!((texture.width(), texture.height()), (8, 4));
        let texture = AtlasTexture::decode(&png(6, 3, [0, 0, 255, 255]), TargetFormat::PvrtcRgba4).unwrap();
        assert_eq!((texture.width(), texture.height()), (8, 8));
    }

    #[test]
    fn sixteen_bit_formats_pack_little_endian() {
        let bytes = png(1, 1, [0xff, 0x80, 0x10, 0xff]);
        let rgba4444 = AtlasTexture::decode(&bytes, TargetFormat::Rgba4444).unwrap();
        assert_eq!(rgba4444.encode().unwrap(), 0xf81fu16.to_le_bytes().to_vec());
        let rgb565 = AtlasTexture::decode(&bytes, TargetFormat::Rgb565).unwrap();
        assert_eq!(rgb565.encode().unwrap(), 0xfc02u16.to_le_bytes().to_vec());
    }

    #[test]
    fn block_formats_need_a_compressor() {
        let texture = AtlasTexture::decode(&png(4, 4, [1, 2, 3, 4]), TargetFormat::Etc2Rgba8).unwrap();
        assert!(matches!(
            texture.encode(),
            Err(TextureError::RequiresCompressor(TargetFormat::Etc2Rgba8))
        ));
        assert_eq!(texture.encode_with(&Echo).unwrap(), vec![4, 4]);

        let texture = AtlasTexture::decode(&png(4, 4, [1, 2, 3, 4]), TargetFormat::PvrtcRgba4).unwrap();
        assert!(matches!(
            texture.encode_with(&Echo),
            Err(TextureError::Compressor { .. })
        ));
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        assert!(matches!(
            AtlasTexture::decode(b"not a png", TargetFormat::Rgba32),
            Err(TextureError::Decode(_))
        ));
    }
}
