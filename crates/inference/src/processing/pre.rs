use crate::config::DEFAULT_INPUT_SIZE;
use common::span;
use fast_image_resize::{FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer, images::Image};
use image::RgbImage;
use ndarray::{Array, IxDyn};

const LETTERBOX_COLOR: u8 = 114;

pub struct PreProcessor {
    pub input_size: (u32, u32),
    rgb_buffer: Vec<u8>,
    letterboxed_buffer: Vec<u8>,
}

impl PreProcessor {
    pub fn new(input_size: (u32, u32)) -> Self {
        Self {
            input_size,
            rgb_buffer: Vec::with_capacity(1920 * 1080 * 3),
            letterboxed_buffer: vec![LETTERBOX_COLOR; (input_size.0 * input_size.1 * 3) as usize],
        }
    }

    /// Letterbox a decoded image into the model input tensor.
    ///
    /// Returns the tensor plus the scale and x/y offsets needed to map boxes back.
    pub fn preprocess_image(
        &mut self,
        image: &RgbImage,
    ) -> anyhow::Result<(Array<f32, IxDyn>, f32, f32, f32)> {
        self.preprocess_frame(image.as_raw(), image.width(), image.height())
    }

    pub fn preprocess_frame(
        &mut self,
        pixels: &[u8],
        width: u32,
        height: u32,
    ) -> anyhow::Result<(Array<f32, IxDyn>, f32, f32, f32)> {
        let _s = span!("preprocess_frame");

        tracing::trace!(
            width,
            height,
            pixel_bytes = pixels.len(),
            "Preprocessing frame dimensions"
        );

        if width == 0 || height == 0 {
            anyhow::bail!("Image has no pixels ({}x{})", width, height);
        }

        self.copy_rgb_pixels(pixels, width, height)?;

        let (scale, offset_x, offset_y) = self.resize_and_letterbox(width, height)?;

        let input = self.normalize()?;

        Ok((input, scale, offset_x, offset_y))
    }

    fn copy_rgb_pixels(&mut self, pixels: &[u8], width: u32, height: u32) -> anyhow::Result<()> {
        let _s = span!("copy_rgb_pixels");

        let expected_size = (width * height * 3) as usize;

        if pixels.len() != expected_size {
            anyhow::bail!(
                "Buffer size mismatch: expected {}, got {} bytes",
                expected_size,
                pixels.len()
            );
        }

        self.rgb_buffer.clear();
        self.rgb_buffer.extend_from_slice(pixels);

        Ok(())
    }

    fn resize_and_letterbox(&mut self, width: u32, height: u32) -> anyhow::Result<(f32, f32, f32)> {
        let _s = span!("resize_and_letterbox");

        if self.input_size.0 == 0 || self.input_size.1 == 0 {
            anyhow::bail!(
                "Model input size must be non-zero (got {}x{})",
                self.input_size.0,
                self.input_size.1
            );
        }

        let scale =
            (self.input_size.0 as f32 / width as f32).min(self.input_size.1 as f32 / height as f32);
        let new_width = ((width as f32 * scale) as u32).clamp(1, self.input_size.0);
        let new_height = ((height as f32 * scale) as u32).clamp(1, self.input_size.1);

        let offset_x = (self.input_size.0 - new_width) / 2;
        let offset_y = (self.input_size.1 - new_height) / 2;

        let src = Image::from_slice_u8(width, height, &mut self.rgb_buffer, PixelType::U8x3)?;

        let mut resized = Image::new(new_width, new_height, PixelType::U8x3);

        Resizer::new().resize(
            &src,
            &mut resized,
            &ResizeOptions::new().resize_alg(ResizeAlg::Convolution(FilterType::Bilinear)),
        )?;

        self.letterboxed_buffer.fill(LETTERBOX_COLOR);

        let stride = (self.input_size.0 * 3) as usize;
        let row_bytes = (new_width * 3) as usize;
        let origin = offset_y as usize * stride + offset_x as usize * 3;

        for (y, row) in resized.buffer().chunks_exact(row_bytes).enumerate() {
            let start = origin + y * stride;
            self.letterboxed_buffer[start..start + row_bytes].copy_from_slice(row);
        }

        Ok((scale, offset_x as f32, offset_y as f32))
    }

    /// HWC u8 to NCHW f32 in `[0, 1]`.
    fn normalize(&self) -> anyhow::Result<Array<f32, IxDyn>> {
        let _s = span!("normalize");

        let width = self.input_size.0 as usize;
        let height = self.input_size.1 as usize;
        let spatial = width * height;

        let mut output = vec![0.0f32; 3 * spatial];

        for (i, px) in self.letterboxed_buffer.chunks_exact(3).enumerate() {
            output[i] = px[0] as f32 / 255.0;
            output[i + spatial] = px[1] as f32 / 255.0;
            output[i + 2 * spatial] = px[2] as f32 / 255.0;
        }

        Ok(Array::from_shape_vec(
            IxDyn(&[1, 3, height, width]),
            output,
        )?)
    }
}

impl Default for PreProcessor {
    fn default() -> Self {
        Self::new(DEFAULT_INPUT_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Test RGB preprocessing
    #[test]
    fn test_rgb_preprocessing() {
        let pixels = vec![
            255, 0, 0, // Red pixel
            0, 255, 0, // Green pixel
            0, 0, 255, // Blue pixel
            255, 255, 255, // White pixel
        ];

        let mut preprocessor = PreProcessor::default();
        let result = preprocessor.preprocess_frame(&pixels, 2, 2);

        assert!(result.is_ok(), "RGB preprocessing should succeed");
        let (output, _, _, _) = result.unwrap();
        assert_eq!(output.shape(), &[1, 3, 640, 640]);
    }

    /// Test buffer size mismatch detection
    #[test]
    fn test_buffer_size_mismatch_detection() {
        let pixels = vec![0u8; 200]; // Wrong size for 10x10

        let mut preprocessor = PreProcessor::default();
        let result = preprocessor.preprocess_frame(&pixels, 10, 10);

        assert!(result.is_err(), "Size mismatch should return error");
        assert!(
            result.unwrap_err().to_string().contains("mismatch"),
            "Error should mention mismatch"
        );
    }

    #[test]
    fn test_zero_input_size_is_error() {
        let image = RgbImage::from_pixel(8, 8, image::Rgb([10, 10, 10]));

        for input_size in [(0, 0), (640, 0), (0, 640)] {
            let mut preprocessor = PreProcessor::new(input_size);
            let err = preprocessor.preprocess_image(&image).unwrap_err();
            assert!(err.to_string().contains("non-zero"), "{input_size:?}: {err}");
        }
    }

    #[test]
    fn test_empty_image_rejected() {
        let mut preprocessor = PreProcessor::default();
        assert!(preprocessor.preprocess_frame(&[], 0, 0).is_err());
    }

    /// Test letterboxing preserves aspect ratio
    #[test]
    fn test_letterboxing_preserves_aspect_ratio() {
        // 800x600 image (4:3 aspect ratio)
        let image = RgbImage::from_pixel(800, 600, image::Rgb([128, 128, 128]));

        let mut preprocessor = PreProcessor::default();
        let (output, scale, offset_x, offset_y) = preprocessor.preprocess_image(&image).unwrap();

        // Scale should be min(640/800, 640/600) = 0.8
        assert_eq!(scale, 0.8, "Scale should preserve aspect ratio");

        // Resized dimensions: 800*0.8 = 640, 600*0.8 = 480
        // Offset Y: (640 - 480) / 2 = 80
        assert_eq!(offset_x, 0.0, "X offset should be 0 for wide image");
        assert_eq!(offset_y, 80.0, "Y offset should center vertically");

        assert_eq!(output.shape(), &[1, 3, 640, 640]);

        // Padding rows carry the letterbox grey, content rows the image grey
        let pad = output[[0, 0, 10, 320]];
        let content = output[[0, 0, 320, 320]];
        assert!((pad - 114.0 / 255.0).abs() < 1e-6, "pad = {}", pad);
        assert!((content - 128.0 / 255.0).abs() < 1e-2, "content = {}", content);
    }

    /// Test pixel scaling to [0, 1] with channels in RGB order
    #[test]
    fn test_unit_scaling_per_channel() {
        let image = RgbImage::from_pixel(640, 640, image::Rgb([255, 0, 51]));

        let mut preprocessor = PreProcessor::default();
        let (output, scale, offset_x, offset_y) = preprocessor.preprocess_image(&image).unwrap();

        assert_eq!((scale, offset_x, offset_y), (1.0, 0.0, 0.0));
        assert!((output[[0, 0, 100, 100]] - 1.0).abs() < 1e-6);
        assert!(output[[0, 1, 100, 100]].abs() < 1e-6);
        assert!((output[[0, 2, 100, 100]] - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_extreme_aspect_ratio_does_not_collapse() {
        let image = RgbImage::from_pixel(4000, 2, image::Rgb([10, 10, 10]));

        let mut preprocessor = PreProcessor::default();
        let (output, _, _, offset_y) = preprocessor.preprocess_image(&image).unwrap();

        assert_eq!(output.shape(), &[1, 3, 640, 640]);
        assert_eq!(offset_y, 319.0);
    }
}
