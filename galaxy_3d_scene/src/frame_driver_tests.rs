use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use std::thread;
use crate::device::mock_device::{MockDevice, MockDeviceState};
use crate::device::GraphicsDevice;
use crate::scene::{
    GeometryBatch, GraphicsResource, Renderable, RenderPasses, Updateable,
    VertexPositionColorTexture, AABB,
};
use glam::Vec3;
use crate::sprite::SpriteRenderable;
use crate::texture_cache::ImageData;
use super::*;

// ============================================================================
// Helpers
// ============================================================================

type Log = Arc<Mutex<Vec<String>>>;

/// Free opaque drawable logging lifecycle calls
struct Recorder {
    name: &'static str,
    log: Log,
}

impl GraphicsResource for Recorder {
    fn create_device_objects(
        &mut self,
        _device: &mut dyn GraphicsDevice,
        _cmd: &mut dyn CommandList,
        _ctx: &SceneContext,
    ) -> Result<()> {
        self.log.lock().unwrap().push(format!("create:{}", self.name));
        Ok(())
    }

    fn destroy_device_objects(&mut self) {
        self.log.lock().unwrap().push(format!("destroy:{}", self.name));
    }
}

impl Renderable for Recorder {
    fn render_passes(&self) -> RenderPasses {
        RenderPasses::OPAQUE
    }

    fn render(
        &mut self,
        _device: &dyn GraphicsDevice,
        _cmd: &mut dyn CommandList,
        _ctx: &SceneContext,
        _pass: RenderPasses,
    ) -> Result<()> {
        self.log.lock().unwrap().push(format!("render:{}", self.name));
        Ok(())
    }
}

impl Updateable for Recorder {
    fn update(&mut self, time: &FrameTime) -> Result<()> {
        self.log.lock().unwrap().push(format!("update:{}", time.total_seconds));
        Ok(())
    }
}

/// Drawable that asks its batch for more quads than it holds
struct Overfill {
    batch: GeometryBatch<VertexPositionColorTexture>,
}

impl GraphicsResource for Overfill {
    fn create_device_objects(
        &mut self,
        device: &mut dyn GraphicsDevice,
        _cmd: &mut dyn CommandList,
        _ctx: &SceneContext,
    ) -> Result<()> {
        self.batch.create_device_objects(device)
    }

    fn destroy_device_objects(&mut self) {
        self.batch.destroy_device_objects();
    }
}

impl Renderable for Overfill {
    fn render_passes(&self) -> RenderPasses {
        RenderPasses::OPAQUE
    }

    fn render(
        &mut self,
        _device: &dyn GraphicsDevice,
        cmd: &mut dyn CommandList,
        _ctx: &SceneContext,
        _pass: RenderPasses,
    ) -> Result<()> {
        self.batch.begin();
        self.batch.reserve_quads(3)?;
        self.batch.end()?;
        self.batch.submit(cmd)
    }
}

/// Cullable drawable with inverted bounds
struct Inverted;

impl GraphicsResource for Inverted {
    fn create_device_objects(
        &mut self,
        _device: &mut dyn GraphicsDevice,
        _cmd: &mut dyn CommandList,
        _ctx: &SceneContext,
    ) -> Result<()> {
        Ok(())
    }

    fn destroy_device_objects(&mut self) {}
}

impl Renderable for Inverted {
    fn render_passes(&self) -> RenderPasses {
        RenderPasses::OPAQUE
    }

    fn bounding_box(&self) -> Option<AABB> {
        Some(AABB::new(Vec3::ONE, -Vec3::ONE))
    }

    fn render(
        &mut self,
        _device: &dyn GraphicsDevice,
        _cmd: &mut dyn CommandList,
        _ctx: &SceneContext,
        _pass: RenderPasses,
    ) -> Result<()> {
        Ok(())
    }
}

/// Free drawable whose first `failures` renders fail
struct Flaky {
    failures: usize,
}

impl GraphicsResource for Flaky {
    fn create_device_objects(
        &mut self,
        _device: &mut dyn GraphicsDevice,
        _cmd: &mut dyn CommandList,
        _ctx: &SceneContext,
    ) -> Result<()> {
        Ok(())
    }

    fn destroy_device_objects(&mut self) {}
}

impl Renderable for Flaky {
    fn render_passes(&self) -> RenderPasses {
        RenderPasses::OPAQUE
    }

    fn render(
        &mut self,
        _device: &dyn GraphicsDevice,
        _cmd: &mut dyn CommandList,
        _ctx: &SceneContext,
        _pass: RenderPasses,
    ) -> Result<()> {
        if self.failures > 0 {
            self.failures -= 1;
            return Err(Error::BackendError("device lost".to_string()));
        }
        Ok(())
    }
}

fn driver() -> (FrameDriver, Arc<MockDeviceState>) {
    driver_on(MockDevice::new(800, 600), SceneConfig::default())
}

fn driver_on(device: MockDevice, config: SceneConfig) -> (FrameDriver, Arc<MockDeviceState>) {
    let tracker = device.tracker();
    let mut driver = FrameDriver::new(Box::new(device), config).unwrap();
    driver.create_graphics_device_objects().unwrap();
    (driver, tracker)
}

fn recorder(name: &'static str, log: &Log) -> Arc<Mutex<Recorder>> {
    Arc::new(Mutex::new(Recorder { name, log: log.clone() }))
}

fn take(log: &Log) -> Vec<String> {
    std::mem::take(&mut *log.lock().unwrap())
}

// ============================================================================
// Lifecycle
// ============================================================================

#[test]
fn test_draw_requires_device_objects() {
    let mut driver = FrameDriver::new(Box::new(MockDevice::new(800, 600)), SceneConfig::default()).unwrap();
    assert!(matches!(driver.draw(), Err(Error::InvalidState(_))));
}

#[test]
fn test_invalid_config_rejected() {
    let config = SceneConfig { split_threshold: 0, ..SceneConfig::default() };
    let result = FrameDriver::new(Box::new(MockDevice::new(800, 600)), config);
    assert!(matches!(result, Err(Error::InitializationFailed(_))));
}

#[test]
fn test_creation_recorded_on_init_list() {
    let (driver, tracker) = driver();
    let log = tracker.log();

    assert_eq!(log.first().map(String::as_str), Some("begin(Recreation Initialization Command List)"));
    assert_eq!(log.last().map(String::as_str), Some("submit(1)"));
    assert!(log.contains(&"end(Recreation Initialization Command List)".to_string()));
    assert!(driver.context().has_device_objects());
    assert!(driver.scene().has_device_objects());
}

#[test]
fn test_draw_records_and_submits_frame() {
    let (mut driver, tracker) = driver();
    tracker.clear_log();

    driver.draw().unwrap();

    let log = tracker.log();
    assert_eq!(log.first().map(String::as_str), Some("begin(Frame Commands List)"));
    assert_eq!(
        &log[log.len() - 2..],
        &["end(Frame Commands List)".to_string(), "submit(1)".to_string()]
    );
    // Resource update list + frame list
    assert_eq!(tracker.commands_starting_with("submit").len(), 2);
}

#[test]
fn test_destroy_waits_and_releases_everything() {
    let (mut driver, tracker) = driver();
    let sprite_cache = driver.texture_cache().clone();
    sprite_cache.get_or_load("ship.png", || ImageData::solid(8, 8, [255; 4])).unwrap();
    let sprite = Arc::new(Mutex::new(SpriteRenderable::new(sprite_cache, "ship.png").unwrap()));
    driver.queue_handle().push(sprite).unwrap();
    driver.draw().unwrap();

    let waits = tracker.wait_idle_calls.load(Ordering::SeqCst);
    driver.destroy_graphics_device_objects().unwrap();

    assert_eq!(tracker.wait_idle_calls.load(Ordering::SeqCst), waits + 2);
    assert_eq!(tracker.live_buffers(), 0);
    assert_eq!(tracker.live_textures(), 0);
    assert_eq!(driver.texture_cache().device_texture_count(), 0);
    assert_eq!(driver.texture_cache().image_count(), 1);
    assert!(matches!(driver.draw(), Err(Error::InvalidState(_))));
}

#[test]
fn test_refresh_does_not_leak() {
    let (mut driver, tracker) = driver();
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    driver.queue_handle().push(recorder("p", &log)).unwrap();
    driver.draw().unwrap();
    take(&log);

    let buffers = tracker.live_buffers();
    let textures = tracker.live_textures();
    driver.refresh_device_objects(3).unwrap();

    assert_eq!(tracker.live_buffers(), buffers);
    assert_eq!(tracker.live_textures(), textures);
    assert_eq!(
        take(&log),
        vec!["destroy:p", "create:p", "destroy:p", "create:p", "destroy:p", "create:p"]
    );
    driver.draw().unwrap();
}

// ============================================================================
// Queue
// ============================================================================

#[test]
fn test_queued_drawables_join_at_next_draw() {
    let (mut driver, _tracker) = driver();
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let queue = driver.queue_handle();

    let producer = {
        let log = log.clone();
        thread::spawn(move || {
            queue.push(recorder("a", &log)).unwrap();
            queue.push(recorder("b", &log)).unwrap();
        })
    };
    producer.join().unwrap();
    assert_eq!(driver.scene().renderable_count(), 0);

    driver.draw().unwrap();

    assert_eq!(driver.scene().renderable_count(), 2);
    assert_eq!(take(&log), vec!["create:a", "create:b", "render:a", "render:b"]);
}

#[test]
fn test_queue_closed_with_driver() {
    let (driver, _tracker) = driver();
    let queue = driver.queue_handle();
    drop(driver);

    let log: Log = Arc::new(Mutex::new(Vec::new()));
    assert!(matches!(queue.push(recorder("late", &log)), Err(Error::InvalidState(_))));
}

// ============================================================================
// Latched requests
// ============================================================================

#[test]
fn test_resize_applied_at_next_draw() {
    let (mut driver, tracker) = driver();
    let seen = Arc::new(Mutex::new(Vec::new()));
    {
        let seen = seen.clone();
        driver.add_resize_handler(move |w, h| seen.lock().unwrap().push((w, h)));
    }

    driver.window_resized(640, 480);
    driver.window_resized(1024, 768);
    assert!(tracker.commands_starting_with("resize_main_window").is_empty());

    driver.draw().unwrap();

    assert_eq!(tracker.commands_starting_with("resize_main_window"), vec!["resize_main_window(1024x768)"]);
    assert_eq!(*seen.lock().unwrap(), vec![(1024, 768)]);
    assert!((driver.scene().camera().aspect_ratio() - 1024.0 / 768.0).abs() < 1e-6);
    let main = driver.context().main_framebuffer().unwrap();
    assert_eq!((main.width(), main.height()), (1024, 768));
    assert!(tracker.log().contains(&"set_viewport(1024x768)".to_string()));

    // Applied once
    tracker.clear_log();
    driver.draw().unwrap();
    assert!(tracker.commands_starting_with("resize_main_window").is_empty());
}

#[test]
fn test_sample_count_change_recreates_device_objects() {
    let (mut driver, tracker) = driver();
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    driver.queue_handle().push(recorder("p", &log)).unwrap();
    driver.draw().unwrap();
    take(&log);
    tracker.clear_log();

    driver.change_sample_count(SampleCount::X4);
    assert_eq!(driver.context().sample_count(), SampleCount::X1);
    driver.draw().unwrap();

    assert_eq!(driver.context().sample_count(), SampleCount::X4);
    assert!(driver.context().needs_resolve());
    assert_eq!(take(&log), vec!["destroy:p", "create:p", "render:p"]);
    assert_eq!(tracker.commands_starting_with("resolve_texture").len(), 1);
}

#[test]
fn test_unsupported_sample_count_clamped() {
    let (mut driver, _tracker) = driver_on(
        MockDevice::new(800, 600).with_max_samples(SampleCount::X4),
        SceneConfig::default(),
    );

    driver.change_sample_count(SampleCount::X32);
    driver.draw().unwrap();

    assert_eq!(driver.context().requested_sample_count(), SampleCount::X32);
    assert_eq!(driver.context().sample_count(), SampleCount::X4);
}

// ============================================================================
// Frames
// ============================================================================

#[test]
fn test_run_frame_advances_time() {
    let (mut driver, _tracker) = driver();
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    driver.scene_mut().add_updateable(recorder("clock", &log)).unwrap();

    driver.run_frame(0.5).unwrap();
    driver.run_frame(0.25).unwrap();

    assert_eq!(take(&log), vec!["update:0.5", "update:0.75"]);
    assert_eq!(driver.frame_time().elapsed_seconds, 0.25);
}

#[test]
fn test_sprite_frame_end_to_end() {
    let (mut driver, tracker) = driver();
    driver
        .texture_cache()
        .get_or_load("ship.png", || ImageData::solid(16, 16, [255; 4]))
        .unwrap();
    let sprite = Arc::new(Mutex::new(
        SpriteRenderable::new(driver.texture_cache().clone(), "ship.png").unwrap(),
    ));
    driver.scene_mut().add_updateable(sprite.clone()).unwrap();
    driver.queue_handle().push(sprite).unwrap();

    driver.run_frame(0.016).unwrap();

    assert_eq!(tracker.commands_starting_with("draw_indexed"), vec!["draw_indexed(6, 0, 0)"]);
}

#[test]
fn test_capacity_overflow_aborts_frame() {
    let (mut driver, _tracker) = driver();
    let overfill = Arc::new(Mutex::new(Overfill { batch: GeometryBatch::new("tiny", 2) }));
    driver.queue_handle().push(overfill).unwrap();

    match driver.draw() {
        Err(Error::CapacityExceeded { resource, requested, capacity }) => {
            assert_eq!(resource, "tiny");
            assert_eq!(requested, 3);
            assert_eq!(capacity, 2);
        }
        other => panic!("expected CapacityExceeded, got {:?}", other),
    }
}

#[test]
fn test_rejected_drawable_only_loses_one_frame() {
    let (mut driver, tracker) = driver();
    let log = Log::default();
    let queue = driver.queue_handle();
    queue.push(Arc::new(Mutex::new(Inverted))).unwrap();
    queue.push(recorder("good", &log)).unwrap();

    assert!(matches!(driver.draw(), Err(Error::InvalidBounds(_))));
    let frame_log = tracker.log();
    assert_eq!(frame_log.last().map(String::as_str), Some("end(Frame Commands List)"));
    assert_eq!(driver.scene().renderable_count(), 0);

    let submits = tracker.submits.load(Ordering::SeqCst);
    driver.draw().unwrap();

    assert_eq!(driver.scene().renderable_count(), 1);
    assert_eq!(take(&log), vec!["create:good", "render:good"]);
    assert!(tracker.submits.load(Ordering::SeqCst) > submits);
}

#[test]
fn test_render_error_aborts_only_that_frame() {
    let (mut driver, tracker) = driver();
    driver.queue_handle().push(Arc::new(Mutex::new(Flaky { failures: 1 }))).unwrap();

    assert!(matches!(driver.draw(), Err(Error::BackendError(_))));
    assert!(tracker.log().iter().any(|l| l == "end(Frame Commands List)"));

    driver.draw().unwrap();
    driver.draw().unwrap();
    assert_eq!(driver.scene().renderable_count(), 1);
}

#[test]
fn test_device_out_of_memory_surfaces_on_create() {
    let device = MockDevice::new(800, 600).with_buffer_budget(8);
    let mut driver = FrameDriver::new(Box::new(device), SceneConfig::default()).unwrap();

    assert_eq!(driver.create_graphics_device_objects(), Err(Error::OutOfMemory));
}
