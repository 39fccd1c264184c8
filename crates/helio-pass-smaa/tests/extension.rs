mod common;

use common::*;
use helio_pass_smaa::extension::SMAA_EXTENSION_NAME;
use helio_pass_smaa::{
    Error, ExtensionRegistry, FrameContext, FrameFlags, ScreenPassTexture, SmaaModule, SmaaModuleConfig,
    TableSource, Tunables, ViewRect,
};
use std::sync::Arc;
use wgpu::TextureFormat;

fn start(tunables: Arc<Tunables>) -> (ExtensionRegistry, SmaaModule) {
    let mut registry = ExtensionRegistry::new();
    let module = SmaaModule::startup(SmaaModuleConfig::new(TableSource::Baked, tunables), &mut registry)
        .expect("startup");
    (registry, module)
}

#[test]
fn test_disabled_returns_the_same_texture() {
    init_logger();
    let (registry, _module) = start(Arc::new(Tunables::new()));
    let color = staircase(32, 24, TextureFormat::Rgba8Unorm);
    let input = ScreenPassTexture::full(&color);
    let output = registry.post_process(&FrameContext::new(0), input, None).unwrap();
    assert!(output.is_borrowed());
    assert!(std::ptr::eq(output.texture(), &color));
}

#[test]
fn test_excluded_frames_pass_through() {
    let (registry, _module) = start(enabled_tunables());
    let color = staircase(32, 24, TextureFormat::Rgba8Unorm);

    for flags in [
        FrameFlags::WIREFRAME,
        FrameFlags::SCENE_CAPTURE,
        FrameFlags::REFLECTION_CAPTURE,
        FrameFlags::WIREFRAME | FrameFlags::SCENE_CAPTURE,
    ] {
        let frame = FrameContext::new(7).with_flags(flags);
        let output = registry
            .post_process(&frame, ScreenPassTexture::full(&color), None)
            .unwrap();
        assert!(std::ptr::eq(output.texture(), &color), "{flags:?} ran SMAA");
    }
}

#[test]
fn test_enabled_produces_a_new_texture() {
    init_logger();
    let (registry, _module) = start(enabled_tunables());
    let color = staircase(32, 24, TextureFormat::Rgba8UnormSrgb);
    let rect = ViewRect::new(0, 4, 32, 16);
    let output = registry
        .post_process(&FrameContext::new(1), ScreenPassTexture::new(&color, rect), None)
        .unwrap();
    assert!(!output.is_borrowed());
    assert_eq!(output.view_rect, rect);
    assert_eq!(output.texture().format(), TextureFormat::Rgba8UnormSrgb);
    assert_ne!(output.texture().texels(), color.texels());
}

#[test]
fn test_tunable_changes_apply_on_the_next_frame() {
    let tunables = Arc::new(Tunables::new());
    let (registry, _module) = start(tunables.clone());
    let color = staircase(32, 24, TextureFormat::Rgba8Unorm);

    let first = registry
        .post_process(&FrameContext::new(0), ScreenPassTexture::full(&color), None)
        .unwrap();
    assert!(first.is_borrowed());

    tunables.assign("r.SMAA.Enable=1").unwrap();
    let second = registry
        .post_process(&FrameContext::new(1), ScreenPassTexture::full(&color), None)
        .unwrap();
    assert!(!second.is_borrowed());
}

#[test]
fn test_invalid_view_rect_passes_through() {
    let (registry, _module) = start(enabled_tunables());
    let color = flat(8, 8, TextureFormat::Rgba8Unorm, 0.5);
    let empty = ScreenPassTexture::new(&color, ViewRect::new(0, 0, 0, 8));
    let output = registry.post_process(&FrameContext::new(0), empty, None).unwrap();
    assert!(std::ptr::eq(output.texture(), &color));
}

#[test]
fn test_mismatched_depth_is_an_error() {
    let tunables = enabled_tunables();
    tunables.assign("r.SMAA.EdgeDetectionMode=2").unwrap();
    let (registry, _module) = start(tunables);
    let color = staircase(32, 24, TextureFormat::Rgba8Unorm);
    let depth = staircase_depth(16, 24);
    let result = registry.post_process(&FrameContext::new(0), ScreenPassTexture::full(&color), Some(&depth));
    assert!(matches!(result, Err(Error::InvalidInput(_))));
}

#[test]
fn test_double_startup_is_rejected() {
    let (mut registry, module) = start(enabled_tunables());
    let second = SmaaModule::startup(SmaaModuleConfig::default(), &mut registry);
    assert!(matches!(second, Err(Error::Config(_))));
    assert_eq!(registry.len(), 1);

    module.shutdown(&mut registry).unwrap();
    assert!(!registry.contains(SMAA_EXTENSION_NAME));
}

#[test]
fn test_restart_after_shutdown() {
    let (mut registry, module) = start(enabled_tunables());
    module.shutdown(&mut registry).unwrap();

    let module = SmaaModule::startup(SmaaModuleConfig::default(), &mut registry).unwrap();
    assert!(module.tables().is_loaded());
    assert_eq!(module.tables().load_attempts(), 1);
    module.shutdown(&mut registry).unwrap();
    assert!(registry.is_empty());
}

#[test]
fn test_tables_from_directory() {
    init_logger();
    let dir = tempfile::tempdir().unwrap();
    helio_pass_smaa::lut::write_tables(dir.path()).unwrap();

    let mut registry = ExtensionRegistry::new();
    let module = SmaaModule::startup(
        SmaaModuleConfig::new(TableSource::Directory(dir.path().to_path_buf()), enabled_tunables()),
        &mut registry,
    )
    .unwrap();
    assert!(module.tables().area_table().is_some());
    assert!(module.tables().search_table().is_some());

    let color = staircase(32, 24, TextureFormat::Rgba8Unorm);
    let output = registry
        .post_process(&FrameContext::new(0), ScreenPassTexture::full(&color), None)
        .unwrap();
    assert_ne!(output.texture().texels(), color.texels());
}
