use serde::{Deserialize, Serialize};

/// Axis-aligned box in pixel units of the original image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    /// Builds a box from corner coordinates; width and height are derived.
    pub fn from_corners(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self {
            x1,
            y1,
            x2,
            y2,
            width: x2 - x1,
            height: y2 - y1,
        }
    }

    pub fn is_well_formed(&self) -> bool {
        self.x2 >= self.x1 && self.y2 >= self.y1
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub class_name: String,
    pub class_id: u32,
    pub confidence: f32,
    pub bounding_box: BoundingBox,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_corners_derives_extent() {
        let bbox = BoundingBox::from_corners(10.0, 20.0, 110.0, 70.0);
        assert_eq!(bbox.width, 100.0);
        assert_eq!(bbox.height, 50.0);
        assert!(bbox.is_well_formed());
    }

    #[test]
    fn test_inverted_box_is_not_well_formed() {
        let bbox = BoundingBox::from_corners(50.0, 0.0, 10.0, 10.0);
        assert!(!bbox.is_well_formed());
    }

    #[test]
    fn test_detection_json_field_names() {
        let detection = Detection {
            class_name: "person".to_string(),
            class_id: 0,
            confidence: 0.5,
            bounding_box: BoundingBox::from_corners(1.0, 2.0, 3.0, 4.0),
        };

        let json = serde_json::to_value(&detection).unwrap();
        assert_eq!(json["class_name"], "person");
        assert_eq!(json["class_id"], 0);
        assert_eq!(json["confidence"], 0.5);
        assert_eq!(json["bounding_box"]["x2"], 3.0);
        assert_eq!(json["bounding_box"]["height"], 2.0);
    }
}
