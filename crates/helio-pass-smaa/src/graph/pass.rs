//! Render pass trait and execution context

use super::{PassResourceBuilder, ResourceHandle};
use crate::texture::Texture;
use crate::{Error, Result};
use std::collections::HashMap;

/// Render pass trait - implemented by each stage of the chain
pub trait RenderPass: Send + Sync {
    /// Unique name for this pass
    fn name(&self) -> &str;

    /// Declare resource dependencies
    ///
    /// Called once when the pass is added, to determine pass ordering and
    /// transient lifetimes.
    fn declare_resources(&self, _builder: &mut PassResourceBuilder) {}

    /// Execute the pass
    fn execute(&mut self, ctx: &mut PassContext) -> Result<()>;
}

/// Context for pass execution
///
/// Imported textures are read-only. A transient target is taken out of the
/// context, rendered into, and handed back.
pub struct PassContext<'g, 'a> {
    pub(super) pass_name: &'g str,
    pub(super) imported: &'g HashMap<ResourceHandle, &'a Texture>,
    pub(super) transient: &'g mut HashMap<ResourceHandle, Texture>,
}

impl<'g, 'a> PassContext<'g, 'a> {
    /// Read a graph resource
    pub fn texture(&self, handle: ResourceHandle) -> Result<&Texture> {
        if let Some(texture) = self.imported.get(&handle) {
            return Ok(*texture);
        }
        self.transient.get(&handle).ok_or_else(|| {
            Error::Resource(format!(
                "pass '{}' read resource {:?} which is not live",
                self.pass_name, handle
            ))
        })
    }

    /// Take a transient render target for writing
    pub fn take_target(&mut self, handle: ResourceHandle) -> Result<Texture> {
        self.transient.remove(&handle).ok_or_else(|| {
            Error::Resource(format!(
                "pass '{}' wrote resource {:?} which was never allocated",
                self.pass_name, handle
            ))
        })
    }

    /// Hand a rendered target back to the graph
    pub fn finish_target(&mut self, handle: ResourceHandle, texture: Texture) {
        self.transient.insert(handle, texture);
    }
}
