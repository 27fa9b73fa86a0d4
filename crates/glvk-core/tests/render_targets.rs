//! Integration test: framebuffer objects created per subpass.
//!
//! Run with: cargo test -p glvk-core --test render_targets

mod common;

use std::sync::Arc;

use ash::vk;
use common::*;
use glvk_core::objects::GlObject;
use glvk_core::renderpass::{AttachmentDescription, SubpassDescription};
use glvk_core::resource::{ImageDesc, ImageView, ImageViewDesc};
use glvk_core::{CoreError, Device, GlvkConfig};

fn color_view(device: &Device) -> Arc<ImageView> {
    let image = device
        .create_image(ImageDesc {
            image_type: vk::ImageType::TYPE_2D,
            format: vk::Format::R8G8B8A8_UNORM,
            extent: vk::Extent3D {
                width: 16,
                height: 16,
                depth: 1,
            },
            mip_levels: 1,
            array_layers: 1,
            samples: vk::SampleCountFlags::TYPE_1,
            usage: vk::ImageUsageFlags::COLOR_ATTACHMENT,
        })
        .unwrap();
    device
        .create_image_view(
            &image,
            ImageViewDesc {
                view_type: vk::ImageViewType::TYPE_2D,
                format: vk::Format::R8G8B8A8_UNORM,
                subresource_range: vk::ImageSubresourceRange {
                    aspect_mask: vk::ImageAspectFlags::COLOR,
                    base_mip_level: 0,
                    level_count: 1,
                    base_array_layer: 0,
                    layer_count: 1,
                },
            },
        )
        .unwrap()
}

fn color_attachment() -> AttachmentDescription {
    AttachmentDescription {
        format: vk::Format::R8G8B8A8_UNORM,
        samples: vk::SampleCountFlags::TYPE_1,
        load_op: vk::AttachmentLoadOp::LOAD,
        store_op: vk::AttachmentStoreOp::STORE,
        stencil_load_op: vk::AttachmentLoadOp::DONT_CARE,
    }
}

fn deleted_framebuffers(test: &TestDevice) -> usize {
    test.objects
        .deleted()
        .iter()
        .filter(|o| matches!(o, GlObject::Framebuffer(_)))
        .count()
}

#[test]
fn test_failed_framebuffer_deletes_objects_already_created() {
    let test = make_device(GlvkConfig::default(), Vec::new());
    let render_pass = test
        .device
        .create_render_pass(
            vec![color_attachment()],
            vec![
                SubpassDescription {
                    color: vec![Some(0)],
                    ..Default::default()
                },
                // A color image cannot be a depth/stencil attachment
                SubpassDescription {
                    depth_stencil: Some(0),
                    ..Default::default()
                },
            ],
        )
        .unwrap();

    let result = test.device.create_framebuffer(
        &render_pass,
        vec![color_view(&test.device)],
        16,
        16,
        1,
    );
    assert!(matches!(result, Err(CoreError::InvalidRenderPass(_))));
    assert_eq!(deleted_framebuffers(&test), 1);
}

#[test]
fn test_framebuffer_destroy_deletes_every_subpass_object() {
    let test = make_device(GlvkConfig::default(), Vec::new());
    let render_pass = test
        .device
        .create_render_pass(
            vec![color_attachment()],
            vec![
                SubpassDescription {
                    color: vec![Some(0)],
                    ..Default::default()
                },
                SubpassDescription {
                    color: vec![Some(0)],
                    ..Default::default()
                },
            ],
        )
        .unwrap();
    let framebuffer = test
        .device
        .create_framebuffer(&render_pass, vec![color_view(&test.device)], 16, 16, 1)
        .unwrap();
    assert_eq!(framebuffer.subpass_framebuffers.len(), 2);
    assert_eq!(deleted_framebuffers(&test), 0);

    test.device.destroy_framebuffer(&framebuffer);
    let deleted = test.objects.deleted();
    for name in &framebuffer.subpass_framebuffers {
        assert!(deleted.contains(&GlObject::Framebuffer(*name)));
    }
}
