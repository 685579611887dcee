//
// Copyright 2025 the Mica developers, all rights reserved.
//
// This source code is a part of Mica.
//
//! The paged descriptor-pool allocator.
//!
//! Descriptor sets come from a free-list of `VkDescriptorPool`s. Each pool
//! is created with per-type capacities sized for a typical set; allocation
//! walks existing pools and, on fragmentation or exhaustion, appends a new
//! pool whose size hint doubles up to a cap. Frees return the set to the
//! pool that produced it.
use ash::vk;
use log::error;

use mica_base::{Error, ErrorKind, Result};

/// The set capacity of the first pool page.
const INITIAL_MAX_SETS: u32 = 64;

/// Size hints stop doubling here.
const MAX_MAX_SETS: u32 = 1024;

/// Per-type descriptor multipliers relative to `max_sets`, modeling a
/// "typical" set.
const TYPE_MULTIPLIERS: &[(vk::DescriptorType, u32)] = &[
    (vk::DescriptorType::UNIFORM_BUFFER, 2),
    (vk::DescriptorType::UNIFORM_BUFFER_DYNAMIC, 1),
    (vk::DescriptorType::STORAGE_BUFFER, 1),
    (vk::DescriptorType::STORAGE_BUFFER_DYNAMIC, 1),
    (vk::DescriptorType::SAMPLED_IMAGE, 4),
    (vk::DescriptorType::STORAGE_IMAGE, 1),
    (vk::DescriptorType::SAMPLER, 2),
];

/// A descriptor set plus the index of the pool page that owns it.
#[derive(Debug, Clone, Copy)]
pub struct PoolAllocation {
    pub set: vk::DescriptorSet,
    pub pool: usize,
}

/// See the module documentation.
#[derive(Debug, Default)]
pub struct DescriptorPoolAllocator {
    pools: Vec<vk::DescriptorPool>,
    /// `max_sets` for the next pool page.
    next_max_sets: u32,
}

impl DescriptorPoolAllocator {
    pub fn new() -> Self {
        Self {
            pools: Vec::new(),
            next_max_sets: INITIAL_MAX_SETS,
        }
    }

    /// The number of live pool pages.
    pub fn pool_count(&self) -> usize {
        self.pools.len()
    }

    /// The size hint the next page would be created with. Doubles per page
    /// up to [`MAX_MAX_SETS`].
    pub fn next_size_hint(&self) -> u32 {
        self.next_max_sets
    }

    unsafe fn add_pool(&mut self, device: &ash::Device) -> Result<usize> {
        let max_sets = self.next_max_sets;
        self.next_max_sets = (self.next_max_sets * 2).min(MAX_MAX_SETS);

        let pool_sizes: Vec<vk::DescriptorPoolSize> = TYPE_MULTIPLIERS
            .iter()
            .map(|&(ty, mult)| vk::DescriptorPoolSize {
                ty,
                descriptor_count: max_sets * mult,
            })
            .collect();
        let info = vk::DescriptorPoolCreateInfo::default()
            .flags(vk::DescriptorPoolCreateFlags::FREE_DESCRIPTOR_SET)
            .max_sets(max_sets)
            .pool_sizes(&pool_sizes);

        let pool = device
            .create_descriptor_pool(&info, None)
            .map_err(crate::utils::translate_generic_error)?;
        self.pools.push(pool);
        Ok(self.pools.len() - 1)
    }

    /// Allocate one set with `layout`.
    ///
    /// # Safety
    ///
    /// `device` must be the device every pool page was created on.
    pub unsafe fn allocate(
        &mut self,
        device: &ash::Device,
        layout: vk::DescriptorSetLayout,
    ) -> Result<PoolAllocation> {
        let layouts = [layout];
        for (index, &pool) in self.pools.iter().enumerate() {
            let info = vk::DescriptorSetAllocateInfo::default()
                .descriptor_pool(pool)
                .set_layouts(&layouts);
            match device.allocate_descriptor_sets(&info) {
                Ok(sets) => {
                    return Ok(PoolAllocation {
                        set: sets[0],
                        pool: index,
                    })
                }
                // Any error here should be treated as fragmentation or
                // exhaustion; rotate to the next page.
                Err(_) => continue,
            }
        }

        let index = self.add_pool(device)?;
        let info = vk::DescriptorSetAllocateInfo::default()
            .descriptor_pool(self.pools[index])
            .set_layouts(&layouts);
        match device.allocate_descriptor_sets(&info) {
            Ok(sets) => Ok(PoolAllocation {
                set: sets[0],
                pool: index,
            }),
            Err(result) => {
                error!(
                    "descriptor set allocation failed on a fresh pool: {:?}",
                    result
                );
                Err(Error::with_detail(
                    ErrorKind::OutOfMemory,
                    format!("{:?}", result),
                ))
            }
        }
    }

    /// Return a set to its owning pool page.
    ///
    /// # Safety
    ///
    /// `allocation` must originate from this allocator and must no longer
    /// be referenced by pending command buffers.
    pub unsafe fn free(&mut self, device: &ash::Device, allocation: PoolAllocation) {
        let pool = self.pools[allocation.pool];
        let _ = device.free_descriptor_sets(pool, &[allocation.set]);
    }

    /// Destroy every pool page. Called at device teardown.
    ///
    /// # Safety
    ///
    /// No set allocated from this allocator may be in use.
    pub unsafe fn destroy(&mut self, device: &ash::Device) {
        for pool in self.pools.drain(..) {
            device.destroy_descriptor_pool(pool, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_hint_doubles_up_to_cap() {
        let mut alloc = DescriptorPoolAllocator::new();
        assert_eq!(alloc.next_size_hint(), 64);
        // Drive the hint without a device by replaying the growth rule.
        for _ in 0..10 {
            alloc.next_max_sets = (alloc.next_max_sets * 2).min(MAX_MAX_SETS);
        }
        assert_eq!(alloc.next_size_hint(), MAX_MAX_SETS);
    }
}
