//! Descriptor set layouts and descriptor sets.

use std::collections::BTreeMap;
use std::sync::Arc;

use ash::vk;
use parking_lot::RwLock;

use crate::binding::DescriptorClass;
use crate::error::CoreError;
use crate::handle::Handle;
use crate::resource::{Buffer, BufferView, ImageView, Sampler};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DescriptorSetLayoutBinding {
    pub binding: u32,
    pub descriptor_type: vk::DescriptorType,
    pub count: u32,
    pub stages: vk::ShaderStageFlags,
}

#[derive(Debug)]
pub struct DescriptorSetLayout {
    pub handle: Handle,
    /// Sorted by binding number.
    pub bindings: Vec<DescriptorSetLayoutBinding>,
}

impl DescriptorSetLayout {
    pub fn binding(&self, binding: u32) -> Option<&DescriptorSetLayoutBinding> {
        self.bindings
            .binary_search_by_key(&binding, |b| b.binding)
            .ok()
            .map(|i| &self.bindings[i])
    }
}

/// What one descriptor array element refers to.
#[derive(Debug, Clone)]
pub enum DescriptorInfo {
    Buffer {
        buffer: Arc<Buffer>,
        offset: u64,
        /// `vk::WHOLE_SIZE` is resolved against the buffer size on write.
        range: u64,
    },
    Image {
        view: Option<Arc<ImageView>>,
        sampler: Option<Arc<Sampler>>,
    },
    TexelBuffer {
        view: Arc<BufferView>,
    },
}

impl DescriptorInfo {
    fn accepts(&self, class: DescriptorClass) -> bool {
        use DescriptorClass::*;
        match self {
            DescriptorInfo::Buffer { .. } => matches!(
                class,
                UniformBuffer | StorageBuffer | UniformBufferDynamic | StorageBufferDynamic
            ),
            DescriptorInfo::Image { view, sampler } => match class {
                Sampler => sampler.is_some(),
                CombinedImageSampler => view.is_some() && sampler.is_some(),
                SampledImage | StorageImage | InputAttachment => view.is_some(),
                _ => false,
            },
            DescriptorInfo::TexelBuffer { .. } => {
                matches!(class, UniformTexelBuffer | StorageTexelBuffer)
            }
        }
    }
}

/// Update of consecutive array elements of one binding.
#[derive(Debug, Clone)]
pub struct WriteDescriptorSet {
    pub binding: u32,
    pub first_element: u32,
    pub infos: Vec<DescriptorInfo>,
}

#[derive(Debug)]
pub struct DescriptorSet {
    pub handle: Handle,
    pub layout: Arc<DescriptorSetLayout>,
    /// `(binding, element)` -> descriptor
    contents: RwLock<BTreeMap<(u32, u32), DescriptorInfo>>,
}

impl DescriptorSet {
    pub fn new(handle: Handle, layout: Arc<DescriptorSetLayout>) -> Self {
        Self {
            handle,
            layout,
            contents: RwLock::new(BTreeMap::new()),
        }
    }

    /// Apply writes. Either every write is applied or none is.
    pub fn write(&self, writes: &[WriteDescriptorSet]) -> Result<(), CoreError> {
        let mut staged = Vec::new();
        for write in writes {
            let decl = self.layout.binding(write.binding).ok_or_else(|| {
                CoreError::InvalidDescriptor(format!(
                    "binding {} is not in the set layout",
                    write.binding
                ))
            })?;
            let class = DescriptorClass::from_vk(decl.descriptor_type).ok_or_else(|| {
                CoreError::InvalidDescriptor(format!(
                    "unsupported descriptor type {:?}",
                    decl.descriptor_type
                ))
            })?;
            if write.first_element as usize + write.infos.len() > decl.count as usize {
                return Err(CoreError::InvalidDescriptor(format!(
                    "binding {} has {} elements, write covers {}..{}",
                    write.binding,
                    decl.count,
                    write.first_element,
                    write.first_element as usize + write.infos.len()
                )));
            }
            for (i, info) in write.infos.iter().enumerate() {
                if !info.accepts(class) {
                    return Err(CoreError::InvalidDescriptor(format!(
                        "binding {} expects {:?}",
                        write.binding, class
                    )));
                }
                let info = match info {
                    DescriptorInfo::Buffer {
                        buffer,
                        offset,
                        range,
                    } if *range == vk::WHOLE_SIZE => DescriptorInfo::Buffer {
                        buffer: buffer.clone(),
                        offset: *offset,
                        range: buffer.size.saturating_sub(*offset),
                    },
                    other => other.clone(),
                };
                staged.push(((write.binding, write.first_element + i as u32), info));
            }
        }

        self.contents.write().extend(staged);
        Ok(())
    }

    /// Copy `count` elements from another set.
    pub fn copy_from(
        &self,
        src: &DescriptorSet,
        src_binding: u32,
        src_element: u32,
        dst_binding: u32,
        dst_element: u32,
        count: u32,
    ) -> Result<(), CoreError> {
        let infos = {
            let contents = src.contents.read();
            (0..count)
                .map(|i| {
                    contents
                        .get(&(src_binding, src_element + i))
                        .cloned()
                        .ok_or_else(|| {
                            CoreError::InvalidDescriptor(format!(
                                "source binding {} element {} was never written",
                                src_binding,
                                src_element + i
                            ))
                        })
                })
                .collect::<Result<Vec<_>, _>>()?
        };
        self.write(&[WriteDescriptorSet {
            binding: dst_binding,
            first_element: dst_element,
            infos,
        }])
    }

    pub fn get(&self, binding: u32, element: u32) -> Option<DescriptorInfo> {
        self.contents.read().get(&(binding, element)).cloned()
    }

    /// Every written descriptor in `(binding, element)` order.
    pub fn snapshot(&self) -> Vec<((u32, u32), DescriptorInfo)> {
        self.contents
            .read()
            .iter()
            .map(|(k, v)| (*k, v.clone()))
            .collect()
    }
}
