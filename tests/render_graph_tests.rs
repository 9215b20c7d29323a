//! Render graph and prepass integration tests.
//!
//! These record graphs directly through [`RenderGraph::begin_recording`]
//! instead of going through the frame driver.

mod common;

use rstest::rstest;

use deferred_pipeline::backend::dummy::*;
use deferred_pipeline::backend::*;
use deferred_pipeline::pipeline::*;
use deferred_pipeline::render_graph::*;
use deferred_pipeline::scene::*;
use deferred_pipeline::error::GraphResult;
use deferred_pipeline::{GraphBuildError, RenderError};

fn color(name: &str, size: u32) -> TextureDescriptor {
    TextureDescriptor {
        name: name.into(),
        width: size,
        height: size,
        clear: true,
        ..Default::default()
    }
}

fn draw_into(
    builder: &mut PassBuilder,
    target: TextureHandle,
    list: VisibilityListHandle,
) -> GraphResult<PassCommand> {
    builder.use_color_attachment(target, 0, AccessMode::Write)?;
    Ok(PassCommand::DrawVisibilityList { list })
}

#[test]
fn test_pass_without_resources_keeps_its_place() {
    common::init_logging();
    let mut graph = RenderGraph::new();
    let mut backend = DummyBackend::new();
    let mut cmd = backend.create_command_buffer("Test");
    let culling = CullingResults::default();
    let params = RecordingParams {
        frame_index: 0,
        label: "Test",
        culling: &culling,
    };
    let mut scope = graph.begin_recording(params, &mut backend, &mut cmd).unwrap();

    let target = scope.create_texture(&color("Target", 16)).unwrap();
    let list = scope.create_visibility_list(VisibilityListDesc::opaque(ShaderTag::GBUFFER));

    scope
        .add_pass("Write", ProfileId::GBuffer, |b| draw_into(b, target, list))
        .unwrap();
    let marker = scope
        .add_pass("Marker", ProfileId::GBuffer, |_| {
            Ok(PassCommand::DrawVisibilityList { list })
        })
        .unwrap();
    scope
        .add_pass("Overwrite", ProfileId::GBuffer, |b| draw_into(b, target, list))
        .unwrap();

    assert!(scope.graph().pass(marker).unwrap().accesses.is_empty());
    let report = scope.execute().unwrap();
    assert_eq!(report.executed_passes, vec!["Write", "Marker", "Overwrite"]);
    assert_eq!(report.created_textures, 1);

    // Only the passes with attachments bind render targets
    let bindings = cmd
        .commands()
        .iter()
        .filter(|c| matches!(c, DummyCommand::SetRenderTargets { .. }))
        .count();
    assert_eq!(bindings, 2);
}

#[test]
fn test_transient_textures_with_disjoint_lifetimes_share_memory() {
    let mut graph = RenderGraph::new();
    let mut backend = DummyBackend::new();
    let mut cmd = backend.create_command_buffer("Test");
    let culling = CullingResults::default();
    let params = RecordingParams {
        frame_index: 0,
        label: "Test",
        culling: &culling,
    };
    let mut scope = graph.begin_recording(params, &mut backend, &mut cmd).unwrap();

    let list = scope.create_visibility_list(VisibilityListDesc::opaque(ShaderTag::GBUFFER));
    let first = scope.create_texture(&color("First", 64)).unwrap();
    let second = scope.create_texture(&color("Second", 64)).unwrap();
    for target in [first, second] {
        scope
            .add_pass("Draw", ProfileId::GBuffer, |builder| {
                builder.use_color_attachment(target, 0, AccessMode::Write)?;
                Ok(PassCommand::DrawVisibilityList { list })
            })
            .unwrap();
    }

    let report = scope.execute().unwrap();
    assert_eq!(report.created_textures, 1);
    assert_eq!(report.reused_textures, 1);
}

#[rstest]
#[case::color_as_depth(false)]
#[case::depth_as_color(true)]
fn test_attachment_kind_is_checked(#[case] depth_texture: bool) {
    let mut graph = RenderGraph::new();
    let mut backend = DummyBackend::new();
    let mut cmd = backend.create_command_buffer("Test");
    let culling = CullingResults::default();
    let params = RecordingParams {
        frame_index: 0,
        label: "Test",
        culling: &culling,
    };
    let mut scope = graph.begin_recording(params, &mut backend, &mut cmd).unwrap();
    let resolution = Resolution::new(32, 32).unwrap();
    let desc = if depth_texture {
        depth_buffer_desc(resolution, true, MsaaSamples::None).unwrap()
    } else {
        gbuffer_color_desc(resolution, 0).unwrap()
    };
    let texture = scope.create_texture(&desc).unwrap();
    let list = scope.create_visibility_list(VisibilityListDesc::opaque(ShaderTag::GBUFFER));

    let result = scope.add_pass("Mismatch", ProfileId::GBuffer, |builder| {
        if depth_texture {
            builder.use_color_attachment(texture, 0, AccessMode::Write)?;
        } else {
            builder.use_depth_attachment(texture, AccessMode::Write)?;
        }
        Ok(PassCommand::DrawVisibilityList { list })
    });
    assert!(matches!(
        result,
        Err(GraphBuildError::AttachmentKindMismatch { .. })
    ));
    assert_eq!(scope.pass_count(), 0);
}

#[rstest]
#[case::without_msaa(false)]
#[case::with_msaa(true)]
fn test_prepass_output(#[case] allow_msaa: bool) {
    let mut graph = RenderGraph::new();
    let mut backend = DummyBackend::new();
    let mut cmd = backend.create_command_buffer("Test");
    let culling = CullingResults::default();
    let camera = Camera::new("Main", PixelRect::sized(800, 600)).with_msaa(allow_msaa);
    let params = RecordingParams {
        frame_index: 0,
        label: &camera.name,
        culling: &culling,
    };
    let mut scope = graph.begin_recording(params, &mut backend, &mut cmd).unwrap();

    let output = render_prepass(&mut scope, &camera, MsaaSamples::X4).unwrap();

    assert_eq!(output.gbuffer().len(), 2);
    assert_eq!(output.stencil_buffer(), output.depth_buffer());
    assert_eq!(output.gbuffer()[1], output.normal_buffer());
    assert_eq!(
        output.depth_buffer() == output.resolved_depth_buffer(),
        !allow_msaa
    );

    let resolved = scope.descriptor(output.resolved_depth_buffer()).unwrap();
    assert_eq!(resolved.msaa_samples, MsaaSamples::None);
    let depth = scope.descriptor(output.depth_buffer()).unwrap();
    let expected = if allow_msaa {
        MsaaSamples::X4
    } else {
        MsaaSamples::None
    };
    assert_eq!(depth.msaa_samples, expected);

    let names: Vec<&str> = scope.passes().iter().map(|p| p.name.as_str()).collect();
    if allow_msaa {
        assert_eq!(names, vec!["Depth Prepass", "Resolve Depth", "GBuffer"]);
    } else {
        assert_eq!(names, vec!["Depth Prepass", "GBuffer"]);
    }

    // Every prepass pass opts out of renderer-list culling
    assert!(scope
        .passes()
        .iter()
        .all(|pass| !pass.allow_renderer_list_culling));
}

#[test]
fn test_prepass_keeps_two_targets_with_fallback_normals() {
    let mut graph = RenderGraph::new();
    let mut backend = DummyBackend::new().with_unsupported_texture("NormalBuffer");
    let mut cmd = backend.create_command_buffer("Test");
    let culling = CullingResults::default();
    let camera = Camera::new("Main", PixelRect::sized(320, 200));
    let params = RecordingParams {
        frame_index: 0,
        label: &camera.name,
        culling: &culling,
    };
    let mut scope = graph.begin_recording(params, &mut backend, &mut cmd).unwrap();

    let output = render_prepass(&mut scope, &camera, MsaaSamples::None).unwrap();
    assert_eq!(output.gbuffer().len(), 2);
    let normals = scope.descriptor(output.normal_buffer()).unwrap();
    assert_eq!(normals.name, "NormalBuffer (Fallback)");
    assert_eq!(normals.clear_color, glam::Vec4::ZERO);
}

#[test]
fn test_prepass_rejects_zero_area_camera() {
    let mut graph = RenderGraph::new();
    let mut backend = DummyBackend::new();
    let mut cmd = backend.create_command_buffer("Test");
    let culling = CullingResults::default();
    let camera = Camera::new("Collapsed", PixelRect::sized(0, 480));
    let params = RecordingParams {
        frame_index: 0,
        label: &camera.name,
        culling: &culling,
    };
    let mut scope = graph.begin_recording(params, &mut backend, &mut cmd).unwrap();

    let result = render_prepass(&mut scope, &camera, MsaaSamples::X4);
    assert_eq!(
        result,
        Err(RenderError::GraphBuild(GraphBuildError::InvalidResolution {
            width: 0,
            height: 480
        }))
    );
    assert_eq!(scope.pass_count(), 0);
}

#[test]
fn test_composite_reads_gbuffer_slot_zero() {
    let mut graph = RenderGraph::new();
    let mut backend = DummyBackend::new();
    let material = FinalPassMaterial::new(&mut backend, FINAL_PASS_SHADER).unwrap();
    let mut cmd = backend.create_command_buffer("Test");
    let culling = CullingResults::default();
    let camera = Camera::new("Main", PixelRect::sized(640, 480));
    let params = RecordingParams {
        frame_index: 0,
        label: &camera.name,
        culling: &culling,
    };
    let mut scope = graph.begin_recording(params, &mut backend, &mut cmd).unwrap();

    let backbuffer = scope
        .import_backbuffer(camera.target, 640, 480)
        .unwrap();
    let prepass = render_prepass(&mut scope, &camera, MsaaSamples::None).unwrap();
    let result = composite(&mut scope, &camera, &prepass, backbuffer, material.handle()).unwrap();
    assert_eq!(result, backbuffer);

    let final_pass = scope.passes().last().unwrap();
    assert_eq!(final_pass.name, "Final Pass");
    assert_eq!(final_pass.profile, ProfileId::FinalPost);
    assert!(final_pass.reads_resource(prepass.gbuffer()[0]));
    assert!(final_pass.writes_resource(backbuffer));
    assert_eq!(final_pass.color_attachments(), vec![backbuffer]);
}
