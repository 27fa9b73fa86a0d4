//! Binding rework: mapping Vulkan `(set, binding)` coordinates onto the four
//! flat GL binding namespaces.
//!
//! Every pipeline layout builds a [`ShaderBindingTable`] once. Pipelines then
//! rewrite each reflected shader resource to the GL index the table assigned
//! it, and the recorder resolves descriptor writes through the same table, so
//! both sides agree on every index.

use std::collections::BTreeMap;
use std::sync::Arc;

use ash::vk;
use serde::Serialize;

use crate::config::MissingBindingPolicy;
use crate::descriptor::DescriptorSetLayout;
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::error::CoreError;
use crate::reflect::{CompiledShader, ResourceCategory};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum BindingNamespace {
    UniformBuffer,
    StorageBuffer,
    TextureUnit,
    ImageUnit,
}

impl BindingNamespace {
    pub const ALL: [BindingNamespace; 4] = [
        BindingNamespace::UniformBuffer,
        BindingNamespace::StorageBuffer,
        BindingNamespace::TextureUnit,
        BindingNamespace::ImageUnit,
    ];

    fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DescriptorClass {
    Sampler,
    CombinedImageSampler,
    SampledImage,
    StorageImage,
    UniformTexelBuffer,
    StorageTexelBuffer,
    UniformBuffer,
    StorageBuffer,
    UniformBufferDynamic,
    StorageBufferDynamic,
    InputAttachment,
}

impl DescriptorClass {
    pub fn from_vk(ty: vk::DescriptorType) -> Option<Self> {
        Some(match ty {
            vk::DescriptorType::SAMPLER => DescriptorClass::Sampler,
            vk::DescriptorType::COMBINED_IMAGE_SAMPLER => DescriptorClass::CombinedImageSampler,
            vk::DescriptorType::SAMPLED_IMAGE => DescriptorClass::SampledImage,
            vk::DescriptorType::STORAGE_IMAGE => DescriptorClass::StorageImage,
            vk::DescriptorType::UNIFORM_TEXEL_BUFFER => DescriptorClass::UniformTexelBuffer,
            vk::DescriptorType::STORAGE_TEXEL_BUFFER => DescriptorClass::StorageTexelBuffer,
            vk::DescriptorType::UNIFORM_BUFFER => DescriptorClass::UniformBuffer,
            vk::DescriptorType::STORAGE_BUFFER => DescriptorClass::StorageBuffer,
            vk::DescriptorType::UNIFORM_BUFFER_DYNAMIC => DescriptorClass::UniformBufferDynamic,
            vk::DescriptorType::STORAGE_BUFFER_DYNAMIC => DescriptorClass::StorageBufferDynamic,
            vk::DescriptorType::INPUT_ATTACHMENT => DescriptorClass::InputAttachment,
            _ => return None,
        })
    }

    pub fn namespace(self) -> BindingNamespace {
        use DescriptorClass::*;
        match self {
            UniformBuffer | UniformBufferDynamic => BindingNamespace::UniformBuffer,
            StorageBuffer | StorageBufferDynamic => BindingNamespace::StorageBuffer,
            Sampler | CombinedImageSampler | SampledImage | UniformTexelBuffer
            | InputAttachment => BindingNamespace::TextureUnit,
            StorageImage | StorageTexelBuffer => BindingNamespace::ImageUnit,
        }
    }

    pub fn is_dynamic(self) -> bool {
        matches!(
            self,
            DescriptorClass::UniformBufferDynamic | DescriptorClass::StorageBufferDynamic
        )
    }
}

impl ResourceCategory {
    /// Descriptor classes a resource of this category may be bound through,
    /// primary class first, then fallbacks in precedence order.
    pub fn classes(self) -> &'static [DescriptorClass] {
        use DescriptorClass::*;
        match self {
            ResourceCategory::UniformBuffer => &[UniformBuffer, UniformBufferDynamic],
            ResourceCategory::StorageBuffer => &[StorageBuffer, StorageBufferDynamic],
            ResourceCategory::SampledImage => {
                &[CombinedImageSampler, SampledImage, UniformTexelBuffer]
            }
            ResourceCategory::SeparateImage => &[SampledImage, UniformTexelBuffer],
            ResourceCategory::SeparateSampler => &[Sampler, CombinedImageSampler],
            ResourceCategory::StorageImage => &[StorageImage, StorageTexelBuffer],
            ResourceCategory::SubpassInput => &[InputAttachment],
        }
    }
}

/// GL slots assigned to one `(set, binding)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindingSlot {
    pub namespace: BindingNamespace,
    pub base: u32,
    pub count: u32,
    pub class: DescriptorClass,
    /// Position of the first element in the dynamic-offset array, for dynamic buffers.
    pub dynamic_index: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShaderBindingTable {
    slots: BTreeMap<(u32, u32), BindingSlot>,
    totals: [u32; 4],
    dynamic_count: u32,
}

impl ShaderBindingTable {
    /// Assign indices per namespace in ascending `(set, binding)` order. Set
    /// numbers are positions in `set_layouts`.
    pub fn build(set_layouts: &[Arc<DescriptorSetLayout>]) -> Result<Self, CoreError> {
        let mut table = ShaderBindingTable::default();
        for (set, layout) in set_layouts.iter().enumerate() {
            for decl in &layout.bindings {
                if decl.count == 0 {
                    continue;
                }
                let class = DescriptorClass::from_vk(decl.descriptor_type).ok_or_else(|| {
                    CoreError::InvalidDescriptor(format!(
                        "unsupported descriptor type {:?}",
                        decl.descriptor_type
                    ))
                })?;
                let namespace = class.namespace();
                let total = &mut table.totals[namespace.index()];
                let base = *total;
                *total += decl.count;

                let dynamic_index = if class.is_dynamic() {
                    let index = table.dynamic_count;
                    table.dynamic_count += decl.count;
                    Some(index)
                } else {
                    None
                };

                table.slots.insert(
                    (set as u32, decl.binding),
                    BindingSlot {
                        namespace,
                        base,
                        count: decl.count,
                        class,
                        dynamic_index,
                    },
                );
            }
        }
        Ok(table)
    }

    pub fn lookup(&self, set: u32, binding: u32) -> Option<&BindingSlot> {
        self.slots.get(&(set, binding))
    }

    /// The slot at `(set, binding)` if it was declared with `class`.
    pub fn lookup_class(&self, set: u32, binding: u32, class: DescriptorClass) -> Option<&BindingSlot> {
        self.lookup(set, binding).filter(|slot| slot.class == class)
    }

    /// Slots used in a namespace.
    pub fn total(&self, namespace: BindingNamespace) -> u32 {
        self.totals[namespace.index()]
    }

    /// Number of dynamic offsets a full bind of every set consumes.
    pub fn dynamic_count(&self) -> u32 {
        self.dynamic_count
    }

    /// Dynamic offsets consumed by sets before `set`.
    pub fn dynamic_offsets_before(&self, set: u32) -> u32 {
        self.slots
            .range(..(set, 0))
            .filter(|(_, slot)| slot.class.is_dynamic())
            .map(|(_, slot)| slot.count)
            .sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = ((u32, u32), &BindingSlot)> {
        self.slots.iter().map(|(k, v)| (*k, v))
    }
}

/// Where one shader resource ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BindingAssignment {
    pub name: String,
    pub category: ResourceCategory,
    pub set: u32,
    pub binding: u32,
    pub namespace: BindingNamespace,
    pub index: u32,
    pub count: u32,
}

/// Rewrite every reflected resource of `shader` to the GL index `table`
/// assigns it. Misses are reported through `diagnostics` unless the pipeline
/// is a derivative (or allows derivatives); `policy` decides whether a
/// reported miss fails pipeline creation.
pub fn rework_bindings(
    shader: &mut CompiledShader,
    table: &ShaderBindingTable,
    flags: vk::PipelineCreateFlags,
    policy: MissingBindingPolicy,
    diagnostics: &dyn Diagnostics,
) -> Result<Vec<BindingAssignment>, CoreError> {
    let derivative = flags.intersects(
        vk::PipelineCreateFlags::ALLOW_DERIVATIVES | vk::PipelineCreateFlags::DERIVATIVE,
    );
    let mut assignments = Vec::with_capacity(shader.resources.len());
    let mut first_miss = None;

    for resource in &mut shader.resources {
        let slot = resource
            .category
            .classes()
            .iter()
            .find_map(|&class| table.lookup_class(resource.set, resource.binding, class));

        match slot {
            Some(slot) => {
                resource.backend_binding = slot.base;
                assignments.push(BindingAssignment {
                    name: resource.name.clone(),
                    category: resource.category,
                    set: resource.set,
                    binding: resource.binding,
                    namespace: slot.namespace,
                    index: slot.base,
                    count: resource.array_size.min(slot.count),
                });
            }
            None if derivative || policy == MissingBindingPolicy::Ignore => {}
            None => {
                diagnostics.report(Diagnostic::MissingBinding {
                    name: resource.name.clone(),
                    category: resource.category,
                    set: resource.set,
                    binding: resource.binding,
                });
                first_miss.get_or_insert_with(|| CoreError::MissingBinding {
                    name: resource.name.clone(),
                    set: resource.set,
                    binding: resource.binding,
                });
            }
        }
    }

    match first_miss {
        Some(err) if policy == MissingBindingPolicy::Error => Err(err),
        _ => Ok(assignments),
    }
}
