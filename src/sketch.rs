//! Sketch state: the active shader binding, the input textures with their
//! thumbnails, and the material derived from both.

use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::cache::Reloaded;
use crate::preprocess::ShaderLanguage;
use crate::router::ShaderRouter;
use crate::{SketchError, MAX_TEXTURE_UNITS, THUMBNAIL_SIZE, THUMBNAIL_STRIDE};

/// Screen-space square of a thumbnail, in physical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThumbnailRect {
    pub x: i32,
    pub y: i32,
    pub size: u32,
}

impl ThumbnailRect {
    /// Slot `index` of the strip along the bottom edge, one pixel in from the left.
    pub fn at(index: usize, screen_height: u32) -> Self {
        Self {
            x: 1 + index as i32 * THUMBNAIL_STRIDE as i32,
            y: screen_height as i32 - THUMBNAIL_STRIDE as i32,
            size: THUMBNAIL_SIZE,
        }
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        let (left, top) = (self.x as f64, self.y as f64);
        let size = self.size as f64;
        x >= left && x < left + size && y >= top && y < top + size
    }
}

/// What a file dropped onto the window should do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropAction {
    SetShader(PathBuf),
    AddTexture(PathBuf),
    Ignore,
}

/// Sniffs the extension of a dropped file, ignoring case.
pub fn classify_drop(path: &Path) -> DropAction {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "glsl" | "hlsl" | "wgsl" => DropAction::SetShader(path.to_path_buf()),
        "png" => DropAction::AddTexture(path.to_path_buf()),
        _ => DropAction::Ignore,
    }
}

#[derive(Debug)]
pub struct InputEntry<T> {
    pub path: PathBuf,
    pub texture: T,
    pub rect: ThumbnailRect,
}

/// `T` is the texture payload bound to a unit, `M` the material built from the
/// shader and the units.
pub struct Sketch<T, M> {
    router: Rc<ShaderRouter>,
    inputs: Vec<InputEntry<T>>,
    material: Option<M>,
    material_failed: bool,
    screen_height: u32,
}

impl<T, M> Sketch<T, M> {
    pub fn new(router: Rc<ShaderRouter>, screen_height: u32) -> Self {
        Self {
            router,
            inputs: Vec::new(),
            material: None,
            material_failed: false,
            screen_height,
        }
    }

    pub fn shader_path(&self) -> Option<PathBuf> {
        self.router.shader_path()
    }

    /// Points the virtual shader at `path`. Returns `false`, leaving the
    /// material alone, when `path` is already active.
    pub fn set_shader_file(&mut self, path: &Path) -> bool {
        if !self.router.set_shader_path(path) {
            return false;
        }
        self.invalidate_material();
        true
    }

    pub fn inputs(&self) -> &[InputEntry<T>] {
        &self.inputs
    }

    pub fn is_full(&self) -> bool {
        self.inputs.len() >= MAX_TEXTURE_UNITS
    }

    /// Appends an input, bound to the next free texture unit.
    pub fn add_input(&mut self, path: PathBuf, texture: T) -> Result<usize, SketchError> {
        if self.is_full() {
            return Err(SketchError::TooManyInputs(MAX_TEXTURE_UNITS));
        }
        let index = self.inputs.len();
        self.inputs.push(InputEntry {
            path,
            texture,
            rect: ThumbnailRect::at(index, self.screen_height),
        });
        self.invalidate_material();
        Ok(index)
    }

    /// Index of the thumbnail under `(x, y)`.
    pub fn input_at(&self, x: f64, y: f64) -> Option<usize> {
        self.inputs.iter().position(|entry| entry.rect.contains(x, y))
    }

    /// Removes the input whose thumbnail is under `(x, y)`; later inputs move
    /// down one unit and one slot.
    pub fn remove_input_at(&mut self, x: f64, y: f64) -> Option<InputEntry<T>> {
        let index = self.input_at(x, y)?;
        let removed = self.inputs.remove(index);
        self.layout_thumbnails();
        self.invalidate_material();
        Some(removed)
    }

    /// Runs `replace` on every input loaded from `path`. Returns how many matched.
    pub fn replace_inputs(&mut self, path: &Path, mut replace: impl FnMut(&mut InputEntry<T>)) -> usize {
        let mut count = 0;
        for entry in self.inputs.iter_mut().filter(|e| e.path == path) {
            replace(entry);
            count += 1;
        }
        if count > 0 {
            self.invalidate_material();
        }
        count
    }

    /// Applies what a change to `changed` did to the cache.
    ///
    /// A shader that never loaded is not cached and so never shows up in
    /// `reloaded`; while a build has failed, any shader edit retries it.
    /// `upload` runs on each input whose image was reloaded.
    pub fn apply_reloads(&mut self, changed: &Path, reloaded: &[Reloaded], mut upload: impl FnMut(&mut InputEntry<T>)) {
        let shader_edit =
            self.shader_path().as_deref() == Some(changed) || ShaderLanguage::from_path(changed).is_some();
        if self.material_failed && shader_edit {
            self.invalidate_material();
        }

        for reloaded in reloaded {
            match reloaded {
                Reloaded::Shader(_) => self.invalidate_material(),
                Reloaded::Image(path) => {
                    self.replace_inputs(path, &mut upload);
                }
            }
        }
    }

    pub fn set_screen_height(&mut self, screen_height: u32) {
        if self.screen_height != screen_height {
            self.screen_height = screen_height;
            self.layout_thumbnails();
        }
    }

    fn layout_thumbnails(&mut self) {
        let height = self.screen_height;
        for (i, entry) in self.inputs.iter_mut().enumerate() {
            entry.rect = ThumbnailRect::at(i, height);
        }
    }

    /// Texture units as the material sees them: the inputs in order, then `None`.
    pub fn texture_units(&self) -> [Option<&T>; MAX_TEXTURE_UNITS] {
        std::array::from_fn(|i| self.inputs.get(i).map(|entry| &entry.texture))
    }

    pub fn invalidate_material(&mut self) {
        self.material = None;
        self.material_failed = false;
    }

    pub fn material(&self) -> Option<&M> {
        self.material.as_ref()
    }

    /// True after a failed build, until the next invalidation.
    #[cfg(test)]
    pub(crate) fn material_failed(&self) -> bool {
        self.material_failed
    }

    /// Builds the material if it is empty. A failed build is logged and not
    /// retried until something invalidates the material again.
    pub fn ensure_material<F>(&mut self, build: F) -> Option<&M>
    where
        F: FnOnce(&[Option<&T>; MAX_TEXTURE_UNITS]) -> Result<M, SketchError>,
    {
        if self.material.is_none() && !self.material_failed {
            let units = self.texture_units();
            match build(&units) {
                Ok(material) => self.material = Some(material),
                Err(e) => {
                    log::error!("[shader] {}", e);
                    self.material_failed = true;
                }
            }
        }
        self.material.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    const HEIGHT: u32 = 600;

    fn sketch() -> Sketch<&'static str, Vec<Option<&'static str>>> {
        Sketch::new(Rc::new(ShaderRouter::new("wgsl")), HEIGHT)
    }

    /// Material stand-in: the unit bindings it was built from.
    fn build_counting<'a>(
        calls: &'a Cell<usize>,
    ) -> impl FnOnce(&[Option<&&'static str>; MAX_TEXTURE_UNITS]) -> Result<Vec<Option<&'static str>>, SketchError> + 'a {
        move |units| {
            calls.set(calls.get() + 1);
            Ok(units.iter().map(|u| u.copied()).collect())
        }
    }

    fn assert_contiguous(sketch: &Sketch<&'static str, Vec<Option<&'static str>>>) {
        for (i, entry) in sketch.inputs().iter().enumerate() {
            assert_eq!(entry.rect, ThumbnailRect::at(i, HEIGHT), "slot {i}");
        }
    }

    fn center(rect: ThumbnailRect) -> (f64, f64) {
        let half = rect.size as f64 / 2.0;
        (rect.x as f64 + half, rect.y as f64 + half)
    }

    #[test]
    fn thumbnails_start_at_the_origin() {
        assert_eq!(ThumbnailRect::at(0, HEIGHT), ThumbnailRect { x: 1, y: 535, size: 64 });
        assert_eq!(ThumbnailRect::at(3, HEIGHT), ThumbnailRect { x: 196, y: 535, size: 64 });
    }

    #[test]
    fn rect_hit_test_is_half_open() {
        let rect = ThumbnailRect::at(0, HEIGHT);
        assert!(rect.contains(1.0, 535.0));
        assert!(rect.contains(64.9, 598.9));
        assert!(!rect.contains(65.0, 540.0));
        assert!(!rect.contains(0.5, 540.0));
        assert!(!rect.contains(10.0, 534.0));
    }

    #[test]
    fn drops_are_classified_by_extension() {
        assert_eq!(classify_drop(Path::new("/s/a.GLSL")), DropAction::SetShader("/s/a.GLSL".into()));
        assert_eq!(classify_drop(Path::new("a.hlsl")), DropAction::SetShader("a.hlsl".into()));
        assert_eq!(classify_drop(Path::new("a.wgsl")), DropAction::SetShader("a.wgsl".into()));
        assert_eq!(classify_drop(Path::new("t.Png")), DropAction::AddTexture("t.Png".into()));
        assert_eq!(classify_drop(Path::new("t.jpg")), DropAction::Ignore);
        assert_eq!(classify_drop(Path::new("README")), DropAction::Ignore);
    }

    #[test]
    fn same_shader_twice_does_not_rebuild() {
        let calls = Cell::new(0);
        let mut sketch = sketch();

        assert!(sketch.set_shader_file(Path::new("/s/a.wgsl")));
        sketch.ensure_material(build_counting(&calls));
        assert_eq!(calls.get(), 1);

        assert!(!sketch.set_shader_file(Path::new("/s/a.wgsl")));
        sketch.ensure_material(build_counting(&calls));
        assert_eq!(calls.get(), 1);
        assert!(sketch.material().is_some());

        assert!(sketch.set_shader_file(Path::new("/s/b.wgsl")));
        assert!(sketch.material().is_none());
        sketch.ensure_material(build_counting(&calls));
        assert_eq!(calls.get(), 2);
        assert_eq!(sketch.shader_path(), Some(PathBuf::from("/s/b.wgsl")));
    }

    #[test]
    fn units_are_a_padded_prefix_of_the_inputs() {
        let calls = Cell::new(0);
        let mut sketch = sketch();
        sketch.add_input("a.png".into(), "a").unwrap();
        sketch.add_input("b.png".into(), "b").unwrap();

        let units = sketch.ensure_material(build_counting(&calls)).unwrap().clone();
        assert_eq!(units.len(), MAX_TEXTURE_UNITS);
        assert_eq!(&units[..2], &[Some("a"), Some("b")]);
        assert!(units[2..].iter().all(Option::is_none));
    }

    #[test]
    fn removing_rebuilds_with_shifted_units() {
        let calls = Cell::new(0);
        let mut sketch = sketch();
        for (path, tex) in [("a.png", "a"), ("b.png", "b"), ("c.png", "c")] {
            sketch.add_input(path.into(), tex).unwrap();
        }
        sketch.ensure_material(build_counting(&calls));

        let (x, y) = center(sketch.inputs()[0].rect);
        let removed = sketch.remove_input_at(x, y).unwrap();
        assert_eq!(removed.texture, "a");
        assert!(sketch.material().is_none());

        let units = sketch.ensure_material(build_counting(&calls)).unwrap().clone();
        assert_eq!(calls.get(), 2);
        assert_eq!(&units[..3], &[Some("b"), Some("c"), None]);
        assert_contiguous(&sketch);
    }

    #[test]
    fn click_outside_thumbnails_removes_nothing() {
        let mut sketch = sketch();
        sketch.add_input("a.png".into(), "a").unwrap();
        assert!(sketch.remove_input_at(300.0, 100.0).is_none());
        assert_eq!(sketch.inputs().len(), 1);
    }

    #[test]
    fn any_add_remove_sequence_keeps_thumbnails_contiguous() {
        const NAMES: [&str; 6] = ["a", "b", "c", "d", "e", "f"];
        let mut sketch = sketch();
        let mut seed: u32 = 0x5eed;

        for step in 0..200 {
            seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            let roll = (seed >> 16) as usize;
            if roll % 3 != 0 && !sketch.is_full() {
                let name = NAMES[roll % NAMES.len()];
                sketch.add_input(PathBuf::from(name), name).unwrap();
            } else if !sketch.inputs().is_empty() {
                let pick = roll % sketch.inputs().len();
                let (x, y) = center(sketch.inputs()[pick].rect);
                let before = sketch.inputs().len();
                assert!(sketch.remove_input_at(x, y).is_some(), "step {step}");
                assert_eq!(sketch.inputs().len(), before - 1);
            }
            assert_contiguous(&sketch);
        }
    }

    #[test]
    fn list_is_capped_at_the_unit_count() {
        let mut sketch = sketch();
        for _ in 0..MAX_TEXTURE_UNITS {
            sketch.add_input("t.png".into(), "t").unwrap();
        }
        assert!(sketch.is_full());
        assert!(matches!(sketch.add_input("u.png".into(), "u"), Err(SketchError::TooManyInputs(n)) if n == MAX_TEXTURE_UNITS));
    }

    #[test]
    fn failed_build_waits_for_the_next_change() {
        let calls = Cell::new(0);
        let mut sketch: Sketch<&'static str, ()> = Sketch::new(Rc::new(ShaderRouter::new("wgsl")), HEIGHT);
        let failing = |_: &[Option<&&'static str>; MAX_TEXTURE_UNITS]| -> Result<(), SketchError> {
            calls.set(calls.get() + 1);
            Err(SketchError::Gpu("no adapter".to_string()))
        };

        assert!(sketch.ensure_material(failing).is_none());
        assert!(sketch.ensure_material(failing).is_none());
        assert_eq!(calls.get(), 1);
        assert!(sketch.material_failed());

        sketch.add_input("a.png".into(), "a").unwrap();
        assert!(sketch.ensure_material(failing).is_none());
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn replacing_inputs_by_path_invalidates() {
        let calls = Cell::new(0);
        let mut sketch = sketch();
        sketch.add_input("a.png".into(), "a").unwrap();
        sketch.add_input("b.png".into(), "b").unwrap();
        sketch.add_input("a.png".into(), "a").unwrap();
        sketch.ensure_material(build_counting(&calls));

        assert_eq!(sketch.replace_inputs(Path::new("zzz.png"), |_| {}), 0);
        assert!(sketch.material().is_some());

        assert_eq!(sketch.replace_inputs(Path::new("a.png"), |e| e.texture = "a2"), 2);
        assert!(sketch.material().is_none());
        let units = sketch.ensure_material(build_counting(&calls)).unwrap().clone();
        assert_eq!(&units[..3], &[Some("a2"), Some("b"), Some("a2")]);
    }

    fn failed_sketch() -> Sketch<&'static str, Vec<Option<&'static str>>> {
        let mut sketch = sketch();
        sketch.set_shader_file(Path::new("/s/a.wgsl"));
        sketch.ensure_material(|_| Err(SketchError::Gpu("bad".to_string())));
        assert!(sketch.material_failed());
        sketch
    }

    #[test]
    fn failed_build_is_retried_after_a_shader_edit() {
        let mut sketch = failed_sketch();
        sketch.apply_reloads(Path::new("/s/a.wgsl"), &[], |_| {});
        assert!(!sketch.material_failed());

        let mut sketch = failed_sketch();
        sketch.apply_reloads(Path::new("/s/lib/common.GLSL"), &[], |_| {});
        assert!(!sketch.material_failed());
    }

    #[test]
    fn unrelated_edit_leaves_a_failed_build_alone() {
        let mut sketch = failed_sketch();
        sketch.apply_reloads(Path::new("/s/notes.txt"), &[], |_| {});
        assert!(sketch.material_failed());
    }

    #[test]
    fn reloaded_shader_invalidates_the_material() {
        let calls = Cell::new(0);
        let mut sketch = sketch();
        sketch.ensure_material(build_counting(&calls));
        assert!(sketch.material().is_some());

        sketch.apply_reloads(Path::new("/s/notes.txt"), &[], |_| {});
        assert!(sketch.material().is_some());

        sketch.apply_reloads(Path::new("/s/common.wgsl"), &[Reloaded::Shader("Shader.wgsl".to_string())], |_| {});
        assert!(sketch.material().is_none());
        sketch.ensure_material(build_counting(&calls));
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn reloaded_image_replaces_matching_inputs() {
        let calls = Cell::new(0);
        let mut sketch = sketch();
        sketch.add_input("a.png".into(), "a").unwrap();
        sketch.add_input("b.png".into(), "b").unwrap();
        sketch.ensure_material(build_counting(&calls));

        let mut uploaded = Vec::new();
        sketch.apply_reloads(Path::new("b.png"), &[Reloaded::Image("b.png".into())], |entry| {
            uploaded.push(entry.path.clone());
            entry.texture = "b2";
        });
        assert_eq!(uploaded, vec![PathBuf::from("b.png")]);
        assert!(sketch.material().is_none());

        let units = sketch.ensure_material(build_counting(&calls)).unwrap().clone();
        assert_eq!(&units[..2], &[Some("a"), Some("b2")]);
    }

    #[test]
    fn screen_height_change_moves_the_strip() {
        let mut sketch = sketch();
        sketch.add_input("a.png".into(), "a").unwrap();
        sketch.set_screen_height(1200);
        assert_eq!(sketch.inputs()[0].rect, ThumbnailRect::at(0, 1200));
    }
}
