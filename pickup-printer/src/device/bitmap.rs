//! Monochrome raster images

/// 1-bit raster image, rows packed MSB first, 1 = black
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Bitmap {
    /// Wrap packed raster data; `None` if `data` does not match the dimensions
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        let expected = width.div_ceil(8) as usize * height as usize;
        if data.len() != expected {
            return None;
        }
        Some(Self {
            width,
            height,
            data,
        })
    }

    /// All-white image
    pub fn blank(width: u32, height: u32) -> Self {
        let len = width.div_ceil(8) as usize * height as usize;
        Self {
            width,
            height,
            data: vec![0; len],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn bytes_per_row(&self) -> u32 {
        self.width.div_ceil(8)
    }

    /// Packed rows
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Whether the pixel at (x, y) is black
    pub fn is_set(&self, x: u32, y: u32) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        let idx = (y * self.bytes_per_row() + x / 8) as usize;
        self.data[idx] & (1 << (7 - (x % 8))) != 0
    }

    /// Threshold a decoded image into a printable raster
    ///
    /// The image will be:
    /// - Resized to fit `max_width` dots
    /// - Converted to 1-bit monochrome (transparent pixels print white)
    #[cfg(feature = "image")]
    pub fn from_image(img: &image::DynamicImage, max_width: u32) -> Self {
        use image::GenericImageView;

        let (w, h) = img.dimensions();
        let (new_w, new_h) = if w > max_width {
            let ratio = max_width as f64 / w as f64;
            (max_width, ((h as f64 * ratio) as u32).max(1))
        } else {
            (w, h)
        };

        let resized = img.resize_exact(new_w, new_h, image::imageops::FilterType::Nearest);
        let rgba = resized.to_rgba8();
        let x_bytes = new_w.div_ceil(8);
        let mut data = Vec::with_capacity((x_bytes * new_h) as usize);

        for y in 0..new_h {
            for x_byte in 0..x_bytes {
                let mut byte = 0u8;
                for bit in 0..8 {
                    let x = x_byte * 8 + bit;
                    if x >= new_w {
                        continue;
                    }
                    let pixel = rgba.get_pixel(x, y);
                    if pixel[3] < 128 {
                        continue;
                    }
                    let luma = (0.299 * pixel[0] as f32
                        + 0.587 * pixel[1] as f32
                        + 0.114 * pixel[2] as f32) as u8;
                    if luma < 128 {
                        byte |= 1 << (7 - bit);
                    }
                }
                data.push(byte);
            }
        }

        Self {
            width: new_w,
            height: new_h,
            data,
        }
    }
}
