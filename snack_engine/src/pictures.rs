use serde::{Deserialize, Serialize};
use snack_data::args::BlendType;

use crate::interpolation::{Interpolation, Tint};

/// One overlay image. Every animated property keeps its own interpolator,
/// so a saved picture resumes a half-finished move or fade exactly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Picture {
    image: String,
    x: Interpolation,
    y: Interpolation,
    /// Scale factors; 1.0 is the image's natural size.
    scale_x: Interpolation,
    scale_y: Interpolation,
    /// Degrees, clockwise.
    angle: Interpolation,
    /// 0.0 ..= 1.0
    opacity: Interpolation,
    #[serde(default)]
    tint: Tint,
    origin_x: f64,
    origin_y: f64,
    #[serde(default)]
    blend_type: BlendType,
}

impl Picture {
    pub fn image(&self) -> &str {
        &self.image
    }

    pub fn position(&self) -> (f64, f64) {
        (self.x.current(), self.y.current())
    }

    pub fn scale(&self) -> (f64, f64) {
        (self.scale_x.current(), self.scale_y.current())
    }

    pub fn angle(&self) -> f64 {
        self.angle.current()
    }

    pub fn opacity(&self) -> f64 {
        self.opacity.current()
    }

    pub fn blend_type(&self) -> BlendType {
        self.blend_type
    }

    pub fn is_animating(&self) -> bool {
        self.x.is_animating()
            || self.y.is_animating()
            || self.scale_x.is_animating()
            || self.scale_y.is_animating()
            || self.angle.is_animating()
            || self.opacity.is_animating()
            || self.tint.is_animating()
    }

    fn update(&mut self) {
        self.x.update();
        self.y.update();
        self.scale_x.update();
        self.scale_y.update();
        self.angle.update();
        self.opacity.update();
        self.tint.update();
    }

    /// Axis-aligned hit test against the scaled image bounds.
    fn contains(&self, px: f64, py: f64, width: f64, height: f64) -> bool {
        if self.opacity.current() <= 0.0 {
            return false;
        }
        let w = width * self.scale_x.current().abs();
        let h = height * self.scale_y.current().abs();
        let left = self.x.current() - w * self.origin_x;
        let top = self.y.current() - h * self.origin_y;
        px >= left && px < left + w && py >= top && py < top + h
    }
}

/// Parameters of `show_picture` after variable lookups.
#[derive(Debug, Clone, PartialEq)]
pub struct PictureSpec {
    pub image: String,
    pub x: i32,
    pub y: i32,
    pub origin_x: f64,
    pub origin_y: f64,
    pub scale_x: i32,
    pub scale_y: i32,
    pub angle: i32,
    pub opacity: i32,
    pub blend_type: BlendType,
}

/// Picture slots addressed by id. Higher ids draw on top.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Pictures {
    pictures: Vec<Option<Picture>>,
}

impl Pictures {
    pub fn get(&self, id: usize) -> Option<&Picture> {
        self.pictures.get(id).and_then(Option::as_ref)
    }

    fn get_mut(&mut self, id: usize) -> Option<&mut Picture> {
        let picture = self.pictures.get_mut(id).and_then(Option::as_mut);
        if picture.is_none() {
            log::warn!("picture {id} is not shown");
        }
        picture
    }

    pub fn show(&mut self, id: usize, spec: PictureSpec) {
        if self.pictures.len() <= id {
            self.pictures.resize(id + 1, None);
        }
        self.pictures[id] = Some(Picture {
            image: spec.image,
            x: Interpolation::new(f64::from(spec.x)),
            y: Interpolation::new(f64::from(spec.y)),
            scale_x: Interpolation::new(f64::from(spec.scale_x) / 100.0),
            scale_y: Interpolation::new(f64::from(spec.scale_y) / 100.0),
            angle: Interpolation::new(f64::from(spec.angle)),
            opacity: Interpolation::new(f64::from(spec.opacity.clamp(0, 255)) / 255.0),
            tint: Tint::default(),
            origin_x: spec.origin_x,
            origin_y: spec.origin_y,
            blend_type: spec.blend_type,
        });
    }

    pub fn erase(&mut self, id: usize) {
        if let Some(slot) = self.pictures.get_mut(id) {
            *slot = None;
        }
    }

    pub fn move_to(&mut self, id: usize, x: i32, y: i32, frames: u32) {
        if let Some(picture) = self.get_mut(id) {
            picture.x.set_to(f64::from(x), frames);
            picture.y.set_to(f64::from(y), frames);
        }
    }

    pub fn scale_to(&mut self, id: usize, scale_x: i32, scale_y: i32, frames: u32) {
        if let Some(picture) = self.get_mut(id) {
            picture.scale_x.set_to(f64::from(scale_x) / 100.0, frames);
            picture.scale_y.set_to(f64::from(scale_y) / 100.0, frames);
        }
    }

    pub fn rotate_to(&mut self, id: usize, angle: i32, frames: u32) {
        if let Some(picture) = self.get_mut(id) {
            picture.angle.set_to(f64::from(angle), frames);
        }
    }

    pub fn fade_to(&mut self, id: usize, opacity: i32, frames: u32) {
        if let Some(picture) = self.get_mut(id) {
            picture
                .opacity
                .set_to(f64::from(opacity.clamp(0, 255)) / 255.0, frames);
        }
    }

    pub fn tint_to(&mut self, id: usize, red: i32, green: i32, blue: i32, gray: i32, frames: u32) {
        if let Some(picture) = self.get_mut(id) {
            picture.tint.set_to(red, green, blue, gray, frames);
        }
    }

    pub fn change_image(&mut self, id: usize, image: &str) {
        if let Some(picture) = self.get_mut(id) {
            picture.image = image.to_string();
        }
    }

    pub fn is_animating(&self, id: usize) -> bool {
        self.get(id).is_some_and(Picture::is_animating)
    }

    pub fn update(&mut self) {
        for picture in self.pictures.iter_mut().flatten() {
            picture.update();
        }
    }

    /// Topmost picture under a screen point. `image_size` supplies the
    /// pixel size of an image; pictures with unknown sizes are skipped.
    pub fn picture_at<F>(&self, x: i32, y: i32, image_size: F) -> Option<usize>
    where
        F: Fn(&str) -> Option<(u32, u32)>,
    {
        let (px, py) = (f64::from(x), f64::from(y));
        self.pictures
            .iter()
            .enumerate()
            .rev()
            .find_map(|(id, slot)| {
                let picture = slot.as_ref()?;
                let (width, height) = image_size(&picture.image)?;
                picture
                    .contains(px, py, f64::from(width), f64::from(height))
                    .then_some(id)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(image: &str, x: i32, y: i32) -> PictureSpec {
        PictureSpec {
            image: image.to_string(),
            x,
            y,
            origin_x: 0.5,
            origin_y: 0.5,
            scale_x: 100,
            scale_y: 100,
            angle: 0,
            opacity: 255,
            blend_type: BlendType::Normal,
        }
    }

    #[test]
    fn move_interpolates_and_reports_animation() {
        let mut pictures = Pictures::default();
        pictures.show(2, spec("sun", 0, 0));
        assert!(!pictures.is_animating(2));
        pictures.move_to(2, 100, 50, 4);
        pictures.update();
        assert!(pictures.is_animating(2));
        assert_eq!(pictures.get(2).map(Picture::position), Some((25.0, 12.5)));
        for _ in 0..3 {
            pictures.update();
        }
        assert!(!pictures.is_animating(2));
        assert_eq!(pictures.get(2).map(Picture::position), Some((100.0, 50.0)));
    }

    #[test]
    fn operations_on_missing_pictures_are_ignored() {
        let mut pictures = Pictures::default();
        pictures.fade_to(4, 0, 10);
        pictures.erase(4);
        assert!(pictures.get(4).is_none());
        assert!(!pictures.is_animating(4));
    }

    #[test]
    fn hit_test_prefers_topmost() {
        let mut pictures = Pictures::default();
        pictures.show(1, spec("board", 50, 50));
        pictures.show(3, spec("button", 50, 50));
        let size = |image: &str| match image {
            "board" => Some((100, 100)),
            "button" => Some((10, 10)),
            _ => None,
        };
        assert_eq!(pictures.picture_at(52, 52, size), Some(3));
        assert_eq!(pictures.picture_at(10, 10, size), Some(1));
        assert_eq!(pictures.picture_at(200, 10, size), None);
        pictures.fade_to(3, 0, 0);
        assert_eq!(pictures.picture_at(52, 52, size), Some(1));
    }
}
