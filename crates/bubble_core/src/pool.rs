//! Object pools for short-lived render objects
//!
//! Active objects live in a slot arena and callers hold a [`PoolHandle`].
//! Handles are versioned, so releasing the same handle twice (or a handle
//! from a previous occupant of the slot) is a harmless no-op.

use std::any::Any;

use rustc_hash::FxHashMap;
use slotmap::{new_key_type, SlotMap};

use crate::color::Color;
use crate::config::PoolConfig;

new_key_type! {
    /// Handle to an object checked out of an [`ObjectPool`]
    pub struct PoolHandle;
}

/// Reuse counters for a single pool
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PoolStats {
    /// `acquire` calls that had to construct a new object
    pub created: u64,
    /// `acquire` calls served from the free list
    pub reused: u64,
    /// Total factory invocations, including pre-allocation
    pub allocated: u64,
    pub available: usize,
    pub active: usize,
}

impl PoolStats {
    /// `reused / (reused + created)`; zero before the first request
    pub fn efficiency(&self) -> f32 {
        let total = self.created + self.reused;
        if total == 0 {
            0.0
        } else {
            self.reused as f32 / total as f32
        }
    }

    pub fn requests(&self) -> u64 {
        self.created + self.reused
    }
}

/// A free-list pool of `T`
pub struct ObjectPool<T> {
    factory: Box<dyn Fn() -> T>,
    reset: Box<dyn Fn(&mut T)>,
    free: Vec<T>,
    active: SlotMap<PoolHandle, T>,
    max_idle: Option<usize>,
    created: u64,
    reused: u64,
    allocated: u64,
}

impl<T> ObjectPool<T> {
    pub fn new<F, R>(factory: F, reset: R) -> Self
    where
        F: Fn() -> T + 'static,
        R: Fn(&mut T) + 'static,
    {
        Self {
            factory: Box::new(factory),
            reset: Box::new(reset),
            free: Vec::new(),
            active: SlotMap::with_key(),
            max_idle: None,
            created: 0,
            reused: 0,
            allocated: 0,
        }
    }

    /// Pre-populate the free list
    pub fn with_initial_size(mut self, size: usize) -> Self {
        self.resize(size);
        self
    }

    /// Drop released objects instead of keeping more than `max` idle
    pub fn with_max_idle(mut self, max: usize) -> Self {
        self.max_idle = Some(max);
        self
    }

    /// Check out an object, reusing an idle one when possible
    pub fn acquire(&mut self) -> PoolHandle {
        let object = match self.free.pop() {
            Some(object) => {
                self.reused += 1;
                object
            }
            None => {
                self.created += 1;
                self.allocated += 1;
                (self.factory)()
            }
        };
        self.active.insert(object)
    }

    pub fn get(&self, handle: PoolHandle) -> Option<&T> {
        self.active.get(handle)
    }

    pub fn get_mut(&mut self, handle: PoolHandle) -> Option<&mut T> {
        self.active.get_mut(handle)
    }

    /// Return an object to the pool.
    ///
    /// Returns `false` without touching any state when `handle` is not
    /// currently checked out.
    pub fn release(&mut self, handle: PoolHandle) -> bool {
        let Some(mut object) = self.active.remove(handle) else {
            return false;
        };
        (self.reset)(&mut object);
        if self.max_idle.map_or(true, |max| self.free.len() < max) {
            self.free.push(object);
        }
        true
    }

    /// Grow or shrink the free list to exactly `size` idle objects.
    ///
    /// Active objects are never affected.
    pub fn resize(&mut self, size: usize) {
        if self.free.len() > size {
            self.free.truncate(size);
        } else {
            while self.free.len() < size {
                self.allocated += 1;
                self.free.push((self.factory)());
            }
        }
    }

    pub fn is_active(&self, handle: PoolHandle) -> bool {
        self.active.contains_key(handle)
    }

    pub fn iter_active(&self) -> impl Iterator<Item = (PoolHandle, &T)> {
        self.active.iter()
    }

    pub fn iter_active_mut(&mut self) -> impl Iterator<Item = (PoolHandle, &mut T)> {
        self.active.iter_mut()
    }

    /// Idle objects ready for reuse
    pub fn available(&self) -> usize {
        self.free.len()
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            created: self.created,
            reused: self.reused,
            allocated: self.allocated,
            available: self.free.len(),
            active: self.active.len(),
        }
    }
}

impl<T: Default + 'static> ObjectPool<T> {
    /// Pool that builds and resets objects through `Default`
    pub fn with_default() -> Self {
        Self::new(T::default, |object: &mut T| *object = T::default())
    }
}

/// Type-erased view of a pool, used by [`PoolManager`]
pub trait ManagedPool {
    fn stats(&self) -> PoolStats;
    fn resize(&mut self, size: usize);
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: 'static> ManagedPool for ObjectPool<T> {
    fn stats(&self) -> PoolStats {
        ObjectPool::stats(self)
    }

    fn resize(&mut self, size: usize) {
        ObjectPool::resize(self, size);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A resize performed by [`PoolManager::optimize`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PoolAdjustment {
    pub name: String,
    pub from: usize,
    pub to: usize,
}

/// Named registry of pools with periodic size tuning
pub struct PoolManager {
    config: PoolConfig,
    pools: FxHashMap<String, Box<dyn ManagedPool>>,
}

impl PoolManager {
    pub fn new(config: PoolConfig) -> Self {
        Self {
            config,
            pools: FxHashMap::default(),
        }
    }

    /// Manager pre-loaded with particle, bubble and floating-text pools
    pub fn with_render_pools(config: PoolConfig) -> Self {
        let initial = config.min_size;
        let mut manager = Self::new(config);
        manager.register(
            "particle",
            ObjectPool::<Particle>::with_default().with_initial_size(initial),
        );
        manager.register(
            "bubble",
            ObjectPool::<Bubble>::with_default().with_initial_size(initial),
        );
        manager.register(
            "floating_text",
            ObjectPool::<FloatingText>::with_default().with_initial_size(initial),
        );
        manager
    }

    /// Add (or replace) a pool under `name`
    pub fn register<T: 'static>(&mut self, name: impl Into<String>, pool: ObjectPool<T>) {
        let name = name.into();
        tracing::debug!(pool = %name, idle = pool.available(), "registered object pool");
        self.pools.insert(name, Box::new(pool));
    }

    pub fn pool<T: 'static>(&self, name: &str) -> Option<&ObjectPool<T>> {
        self.pools.get(name)?.as_any().downcast_ref()
    }

    pub fn pool_mut<T: 'static>(&mut self, name: &str) -> Option<&mut ObjectPool<T>> {
        self.pools.get_mut(name)?.as_any_mut().downcast_mut()
    }

    pub fn len(&self) -> usize {
        self.pools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }

    /// Stats for every pool, sorted by name
    pub fn stats(&self) -> Vec<(String, PoolStats)> {
        let mut stats: Vec<_> = self
            .pools
            .iter()
            .map(|(name, pool)| (name.clone(), pool.stats()))
            .collect();
        stats.sort_by(|a, b| a.0.cmp(&b.0));
        stats
    }

    /// Shrink pools that rarely reuse and grow busy pools that run dry.
    pub fn optimize(&mut self) -> Vec<PoolAdjustment> {
        let mut names: Vec<String> = self.pools.keys().cloned().collect();
        names.sort();

        let mut adjustments = Vec::new();
        for name in names {
            let Some(pool) = self.pools.get_mut(&name) else {
                continue;
            };
            let stats = pool.stats();
            let Some(target) = target_size(&self.config, &stats) else {
                continue;
            };
            if target != stats.available {
                pool.resize(target);
                tracing::debug!(
                    pool = %name,
                    from = stats.available,
                    to = target,
                    efficiency = stats.efficiency(),
                    "resized object pool"
                );
                adjustments.push(PoolAdjustment {
                    name,
                    from: stats.available,
                    to: target,
                });
            }
        }
        adjustments
    }
}

/// Size a pool should be resized to, if any
fn target_size(config: &PoolConfig, stats: &PoolStats) -> Option<usize> {
    if stats.requests() == 0 {
        return None;
    }
    let (min, max) = (config.min_size, config.max_size);
    let efficiency = stats.efficiency();

    if efficiency < config.shrink_efficiency && stats.available > min {
        Some((stats.available / 2).clamp(min, max))
    } else if efficiency > config.grow_efficiency && stats.available < min {
        Some((stats.available.max(1) * 2).clamp(min, max))
    } else if stats.available > max {
        Some(max)
    } else {
        None
    }
}

/// Pooled particle
#[derive(Clone, Debug, PartialEq)]
pub struct Particle {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub size: f32,
    pub life: f32,
    pub color: Color,
}

impl Default for Particle {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            vx: 0.0,
            vy: 0.0,
            size: 2.0,
            life: 1.0,
            color: Color::WHITE,
        }
    }
}

/// Pooled bubble
#[derive(Clone, Debug, PartialEq)]
pub struct Bubble {
    pub x: f32,
    pub y: f32,
    pub size: f32,
    pub color: Color,
    pub popped: bool,
}

impl Default for Bubble {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            size: 40.0,
            color: Color::from_hex(0x4FC3F7),
            popped: false,
        }
    }
}

/// Pooled score popup
#[derive(Clone, Debug, PartialEq)]
pub struct FloatingText {
    pub x: f32,
    pub y: f32,
    pub text: String,
    pub font_size: f32,
    pub opacity: f32,
    pub color: Color,
}

impl Default for FloatingText {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            text: String::new(),
            font_size: 16.0,
            opacity: 1.0,
            color: Color::WHITE,
        }
    }
}
