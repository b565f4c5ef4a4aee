use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;
use std::time::Instant;

use clap::Parser;
use winit::{
    application::ApplicationHandler,
    dpi::{PhysicalPosition, PhysicalSize},
    event::{ElementState, KeyEvent, MouseButton, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, ModifiersState, PhysicalKey},
    window::{Window, WindowId},
};

use shadersketch::screenshot::{default_screenshot_dir, next_screenshot_path, save_png};
use shadersketch::{
    classify_drop, DropAction, Globals, InputTexture, Material, ReloadDispatcher, Renderer, ResourceCache,
    ShaderLanguage, ShaderRouter, Sketch, SketchError, SHADER_EXTENSION, WINDOW_HEIGHT, WINDOW_TITLE, WINDOW_WIDTH,
};

#[derive(Parser, Debug)]
#[command(name = "shadersketch")]
#[command(about = "Live preview of a shader file, rebuilt whenever it or its imports change")]
struct Args {
    /// Shader to open (.wgsl or .glsl); otherwise drop one onto the window
    shader: Option<PathBuf>,

    /// PNG bound to the next free @input unit (repeatable)
    #[arg(short = 't', long = "texture")]
    textures: Vec<PathBuf>,

    /// Where Ctrl+S screenshots go [default: documents directory]
    #[arg(long)]
    screenshot_dir: Option<PathBuf>,

    #[arg(long, default_value_t = WINDOW_WIDTH)]
    width: u32,

    #[arg(long, default_value_t = WINDOW_HEIGHT)]
    height: u32,
}

/// Everything that lives as long as the window.
struct Session {
    renderer: Renderer,
    cache: ResourceCache,
    router: Rc<ShaderRouter>,
    sketch: Sketch<InputTexture, Material>,
    dispatcher: Option<ReloadDispatcher>,
    screenshot_dir: PathBuf,
    modifiers: ModifiersState,
    cursor: PhysicalPosition<f64>,
    left_press: Option<PhysicalPosition<f64>>,
    started: Instant,
    last_frame: Instant,
    frame: u32,
}

impl Session {
    fn new(window: Arc<Window>, args: &Args) -> Result<Self, SketchError> {
        let renderer = pollster::block_on(Renderer::new(window))?;

        let router = Rc::new(ShaderRouter::new(SHADER_EXTENSION));
        let mut cache = ResourceCache::new();
        cache.add_router(router.clone());
        let sketch = Sketch::new(router.clone(), renderer.size().height);

        let dispatcher = match ReloadDispatcher::new() {
            Ok(dispatcher) => Some(dispatcher),
            Err(e) => {
                log::warn!("[hot-reload] disabled: {}", e);
                None
            }
        };

        let now = Instant::now();
        let mut session = Self {
            renderer,
            cache,
            router,
            sketch,
            dispatcher,
            screenshot_dir: args.screenshot_dir.clone().unwrap_or_else(default_screenshot_dir),
            modifiers: ModifiersState::empty(),
            cursor: PhysicalPosition::new(0.0, 0.0),
            left_press: None,
            started: now,
            last_frame: now,
            frame: 0,
        };

        if let Some(shader) = &args.shader {
            session.open_shader(shader);
        }
        for texture in &args.textures {
            session.add_texture(texture);
        }
        Ok(session)
    }

    fn window(&self) -> &Arc<Window> {
        self.renderer.window()
    }

    /// Handles input events; returns `true` when the event was consumed.
    fn input(&mut self, event: &WindowEvent) -> bool {
        match event {
            WindowEvent::DroppedFile(path) => {
                match classify_drop(path) {
                    DropAction::SetShader(path) => self.open_shader(&path),
                    DropAction::AddTexture(path) => self.add_texture(&path),
                    DropAction::Ignore => log::info!("[drop] ignoring {}", path.display()),
                }
                true
            }
            WindowEvent::ModifiersChanged(modifiers) => {
                self.modifiers = modifiers.state();
                true
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(KeyCode::KeyS),
                        state: ElementState::Pressed,
                        repeat: false,
                        ..
                    },
                ..
            } if self.modifiers.control_key() => {
                self.take_screenshot();
                true
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor = *position;
                true
            }
            WindowEvent::MouseInput {
                state: ElementState::Pressed,
                button: MouseButton::Middle,
                ..
            } => {
                self.remove_texture_under_cursor();
                true
            }
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => {
                self.left_press = (*state == ElementState::Pressed).then_some(self.cursor);
                true
            }
            _ => false,
        }
    }

    fn open_shader(&mut self, path: &Path) {
        let path = match fs::canonicalize(path) {
            Ok(path) => path,
            Err(e) => {
                log::warn!("[drop] cannot open {}: {}", path.display(), e);
                return;
            }
        };
        if ShaderLanguage::from_path(&path) == Some(ShaderLanguage::Hlsl) {
            log::warn!("[drop] {} is HLSL; it will be shown but cannot compile", path.display());
        }

        let previous = self.sketch.shader_path();
        if !self.sketch.set_shader_file(&path) {
            log::info!("[drop] {} is already active", path.display());
            return;
        }
        if let Some(previous) = previous.as_deref() {
            // Its directory is no longer watched, so a cached copy could go stale.
            self.cache.evict_shader(previous);
            if let Some(dir) = previous.parent() {
                self.unwatch(dir);
            }
        }
        if let Some(dir) = path.parent() {
            self.watch(dir);
        }

        let file_name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        self.window().set_title(&format!("{}: {}", WINDOW_TITLE, file_name));
        log::info!("[drop] shader set to {}", path.display());
    }

    fn add_texture(&mut self, path: &Path) {
        if self.sketch.is_full() {
            log::warn!("[drop] {}, ignoring {}", SketchError::TooManyInputs(self.sketch.inputs().len()), path.display());
            return;
        }
        let path = match fs::canonicalize(path) {
            Ok(path) => path,
            Err(e) => {
                log::warn!("[drop] cannot open {}: {}", path.display(), e);
                return;
            }
        };
        let image = match self.cache.image(&path) {
            Ok(image) => image,
            Err(e) => {
                log::warn!("[drop] {}", e);
                return;
            }
        };

        let texture = match self.renderer.create_input_texture(&image, &path.to_string_lossy()) {
            Ok(texture) => texture,
            Err(e) => {
                log::warn!("[drop] ignoring {}: {}", path.display(), e);
                self.cache.release_image(&path);
                return;
            }
        };
        match self.sketch.add_input(path.clone(), texture) {
            Ok(index) => {
                let entry = &self.sketch.inputs()[index];
                self.renderer.place_thumbnail(&entry.texture, entry.rect);
                if let Some(dir) = path.parent() {
                    self.watch(dir);
                }
                log::info!("[drop] {} bound to @input({})", path.display(), index);
            }
            Err(e) => log::warn!("[drop] {}", e),
        }
    }

    fn remove_texture_under_cursor(&mut self) {
        let Some(removed) = self.sketch.remove_input_at(self.cursor.x, self.cursor.y) else {
            return;
        };
        if !self.sketch.inputs().iter().any(|entry| entry.path == removed.path) {
            self.cache.release_image(&removed.path);
        }
        if let Some(dir) = removed.path.parent() {
            self.unwatch(dir);
        }
        self.place_thumbnails();
        log::info!("[drop] removed {}", removed.path.display());
    }

    fn place_thumbnails(&self) {
        for entry in self.sketch.inputs() {
            self.renderer.place_thumbnail(&entry.texture, entry.rect);
        }
    }

    fn watch(&mut self, dir: &Path) {
        if let Some(dispatcher) = &mut self.dispatcher {
            if let Err(e) = dispatcher.watch(dir) {
                log::warn!("[hot-reload] failed to watch {}: {}", dir.display(), e);
            }
        }
    }

    fn unwatch(&mut self, dir: &Path) {
        if let Some(dispatcher) = &mut self.dispatcher {
            dispatcher.unwatch(dir);
        }
    }

    /// Drains the watcher and drops whatever the changed files made stale.
    fn process_changes(&mut self) {
        let Some(dispatcher) = &self.dispatcher else {
            return;
        };
        let changes = dispatcher.drain_changes();
        if changes.is_empty() {
            return;
        }

        for path in changes {
            let reloaded = self.cache.reload_with_dependencies(&path);
            let cache = &mut self.cache;
            let renderer = &self.renderer;
            self.sketch.apply_reloads(&path, &reloaded, |entry| {
                let texture = cache
                    .image(&entry.path)
                    .and_then(|image| renderer.create_input_texture(&image, &entry.path.to_string_lossy()));
                match texture {
                    Ok(texture) => {
                        entry.texture = texture;
                        renderer.place_thumbnail(&entry.texture, entry.rect);
                    }
                    Err(e) => log::warn!("[hot-reload] keeping previous {}: {}", entry.path.display(), e),
                }
            });
        }
    }

    fn resize(&mut self, new_size: PhysicalSize<u32>) {
        self.renderer.resize(new_size);
        self.sketch.set_screen_height(self.renderer.size().height);
        self.place_thumbnails();
    }

    /// Uploads this frame's globals and makes sure a material exists.
    fn update(&mut self) {
        let now = Instant::now();
        let size = self.renderer.size();
        let (press_x, press_y) = self.left_press.map_or((-1.0, -1.0), |p| (p.x as f32, p.y as f32));
        let globals = Globals {
            time: now.duration_since(self.started).as_secs_f32(),
            delta_time: now.duration_since(self.last_frame).as_secs_f32(),
            frame: self.frame,
            input_count: self.sketch.inputs().len() as u32,
            resolution: [size.width as f32, size.height as f32],
            _padding: [0.0; 2],
            mouse: [self.cursor.x as f32, self.cursor.y as f32, press_x, press_y],
        };
        self.renderer.update_globals(&globals);
        self.last_frame = now;
        self.frame = self.frame.wrapping_add(1);

        let cache = &mut self.cache;
        let renderer = &self.renderer;
        let name = self.router.virtual_name().to_string();
        self.sketch.ensure_material(|units| {
            let shader = cache.shader(&name)?;
            renderer.build_material(&shader, units)
        });
    }

    fn render(&self) -> Result<(), wgpu::SurfaceError> {
        let thumbnails: Vec<&InputTexture> = self.sketch.inputs().iter().map(|entry| &entry.texture).collect();
        self.renderer.render(self.sketch.material(), &thumbnails)
    }

    fn take_screenshot(&mut self) {
        self.update();
        let dir = self.screenshot_dir.clone();
        let saved = self.renderer.capture(self.sketch.material()).and_then(|image| {
            fs::create_dir_all(&dir).map_err(|e| SketchError::io(&dir, e))?;
            let path = next_screenshot_path(&dir);
            save_png(&path, image.width(), image.height(), image.as_raw())?;
            Ok(path)
        });
        match saved {
            Ok(path) => log::info!("[screenshot] saved {}", path.display()),
            Err(e) => log::error!("[screenshot] {}", e),
        }
    }
}

struct App {
    args: Args,
    session: Option<Session>,
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.session.is_some() {
            return;
        }

        let attributes = Window::default_attributes()
            .with_title(WINDOW_TITLE)
            .with_inner_size(PhysicalSize::new(self.args.width, self.args.height))
            .with_resizable(false);
        let window = match event_loop.create_window(attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("failed to create window: {}", e);
                event_loop.exit();
                return;
            }
        };

        match Session::new(window, &self.args) {
            Ok(session) => self.session = Some(session),
            Err(e) => {
                log::error!("{}", e);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let Some(session) = &mut self.session else {
            return;
        };
        if session.input(&event) {
            return;
        }
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(physical_size) => session.resize(physical_size),
            WindowEvent::RedrawRequested => {
                session.update();
                match session.render() {
                    Ok(_) => {}
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        let size = session.renderer.size();
                        session.resize(size);
                    }
                    Err(wgpu::SurfaceError::OutOfMemory) => event_loop.exit(),
                    Err(e) => log::warn!("{:?}", e),
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(session) = &mut self.session {
            session.process_changes();
            session.window().request_redraw();
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn,shadersketch=info")).init();
    let args = Args::parse();

    let event_loop = EventLoop::new()?;
    let mut app = App { args, session: None };
    event_loop.run_app(&mut app)?;
    Ok(())
}
