use ab_glyph::{FontVec, PxScale};
use base64::{Engine, engine::general_purpose::STANDARD};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use schema::Detection;
use std::io::Cursor;
use std::path::Path;

const PALETTE: [[u8; 3]; 20] = [
    [0xFF, 0x38, 0x38],
    [0xFF, 0x9D, 0x97],
    [0xFF, 0x70, 0x1F],
    [0xFF, 0xB2, 0x1D],
    [0xCF, 0xD2, 0x31],
    [0x48, 0xF9, 0x0A],
    [0x92, 0xCC, 0x17],
    [0x3D, 0xDB, 0x86],
    [0x1A, 0x93, 0x34],
    [0x00, 0xD4, 0xBB],
    [0x2C, 0x99, 0xA8],
    [0x00, 0xC2, 0xFF],
    [0x34, 0x45, 0x93],
    [0x64, 0x73, 0xFF],
    [0x00, 0x18, 0xEC],
    [0x84, 0x38, 0xFF],
    [0x52, 0x00, 0x85],
    [0xCB, 0x38, 0xFF],
    [0xFF, 0x95, 0xC8],
    [0xFF, 0x37, 0xC7],
];

const LABEL_TEXT_COLOR: Rgb<u8> = Rgb([255, 255, 255]);

pub fn class_color(class_id: u32) -> Rgb<u8> {
    Rgb(PALETTE[class_id as usize % PALETTE.len()])
}

/// Draws detection boxes, and labels when a font is available.
pub struct Annotator {
    font: Option<FontVec>,
}

impl Annotator {
    pub fn new(font: Option<FontVec>) -> Self {
        Self { font }
    }

    pub fn load(font_path: Option<&Path>) -> anyhow::Result<Self> {
        let font = match font_path {
            Some(path) => {
                let bytes = std::fs::read(path).map_err(|e| {
                    anyhow::anyhow!("Failed to read font {}: {}", path.display(), e)
                })?;
                let font = FontVec::try_from_vec(bytes)
                    .map_err(|e| anyhow::anyhow!("Invalid font {}: {}", path.display(), e))?;
                Some(font)
            }
            None => {
                tracing::info!("No FONT_PATH configured, annotated images will carry boxes only");
                None
            }
        };
        Ok(Self { font })
    }

    pub fn draw(&self, image: &RgbImage, detections: &[Detection]) -> RgbImage {
        let mut canvas = image.clone();
        let line_width = line_width(image.width(), image.height());

        for detection in detections {
            let color = class_color(detection.class_id);
            let bbox = &detection.bounding_box;

            let left = bbox.x1.round() as i32;
            let top = bbox.y1.round() as i32;
            let width = (bbox.width.round() as u32).max(1);
            let height = (bbox.height.round() as u32).max(1);

            for i in 0..line_width {
                let rect = Rect::at(left - i as i32, top - i as i32)
                    .of_size(width + 2 * i, height + 2 * i);
                draw_hollow_rect_mut(&mut canvas, rect, color);
            }

            if let Some(font) = &self.font {
                let label = format!("{} {:.2}", detection.class_name, detection.confidence);
                let scale = PxScale::from((line_width * 8) as f32);
                let (text_width, text_height) = text_size(scale, font, &label);
                let tag_height = text_height + 2 * line_width;

                // Tag sits above the box, or inside it when the box touches the top edge
                let tag_top = if top >= tag_height as i32 {
                    top - tag_height as i32
                } else {
                    top
                };

                draw_filled_rect_mut(
                    &mut canvas,
                    Rect::at(left, tag_top).of_size(text_width + 2 * line_width, tag_height),
                    color,
                );
                draw_text_mut(
                    &mut canvas,
                    LABEL_TEXT_COLOR,
                    left + line_width as i32,
                    tag_top + line_width as i32,
                    scale,
                    font,
                    &label,
                );
            }
        }

        canvas
    }
}

/// Stroke width scaled to the image size, never thinner than 2px.
fn line_width(width: u32, height: u32) -> u32 {
    (((width + height) as f32 / 2.0 * 0.003).round() as u32).max(2)
}

pub fn encode_png(image: &RgbImage) -> anyhow::Result<Vec<u8>> {
    let mut buffer = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(image.clone()).write_to(&mut buffer, ImageFormat::Png)?;
    Ok(buffer.into_inner())
}

pub fn encode_png_base64(image: &RgbImage) -> anyhow::Result<String> {
    Ok(STANDARD.encode(encode_png(image)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use schema::BoundingBox;

    fn detection(class_id: u32, x1: f32, y1: f32, x2: f32, y2: f32) -> Detection {
        Detection {
            class_name: "thing".to_string(),
            class_id,
            confidence: 0.9,
            bounding_box: BoundingBox::from_corners(x1, y1, x2, y2),
        }
    }

    #[test]
    fn test_line_width_scales_with_image() {
        assert_eq!(line_width(100, 100), 2);
        assert_eq!(line_width(1920, 1080), 5);
    }

    #[test]
    fn test_draw_outlines_box_in_class_color() {
        let image = RgbImage::from_pixel(100, 100, Rgb([0, 0, 0]));
        let annotated = Annotator::new(None).draw(&image, &[detection(3, 20.0, 20.0, 60.0, 60.0)]);

        let color = class_color(3);
        assert_eq!(*annotated.get_pixel(20, 20), color, "top-left corner");
        assert_eq!(*annotated.get_pixel(40, 20), color, "top edge");
        assert_eq!(*annotated.get_pixel(40, 40), Rgb([0, 0, 0]), "interior untouched");
        assert_eq!(*image.get_pixel(20, 20), Rgb([0, 0, 0]), "source untouched");
    }

    #[test]
    fn test_degenerate_box_does_not_panic() {
        let image = RgbImage::from_pixel(10, 10, Rgb([0, 0, 0]));
        let annotated = Annotator::new(None).draw(&image, &[detection(0, 10.0, 10.0, 10.0, 10.0)]);
        assert_eq!(annotated.dimensions(), (10, 10));
    }

    #[test]
    fn test_palette_wraps() {
        assert_eq!(class_color(0), class_color(20));
    }

    #[test]
    fn test_png_base64_decodes_to_same_image() {
        let image = RgbImage::from_pixel(4, 3, Rgb([1, 2, 3]));
        let encoded = encode_png_base64(&image).unwrap();

        let bytes = STANDARD.decode(encoded).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap().to_rgb8();
        assert_eq!(decoded, image);
    }
}
