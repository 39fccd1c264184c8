//! Render graph with automatic dependency resolution
//!
//! Passes declare what they read and create; the graph orders them, allocates
//! transient textures from a [`TexturePool`] at first use and returns them at
//! last use, so later passes can alias earlier intermediates. A graph lives
//! for a single invocation of the chain.

mod pass;
mod resource;

pub use pass::{PassContext, RenderPass};
pub use resource::{PassId, ResourceHandle};

use crate::resources::TexturePool;
use crate::texture::{Texture, TextureDesc};
use crate::{Error, Result};
use std::collections::{HashMap, HashSet, VecDeque};

/// Render graph for automatic pass ordering and resource management
pub struct RenderGraph<'a> {
    passes: Vec<PassNode>,
    execution_order: Vec<usize>,
    imported: HashMap<ResourceHandle, &'a Texture>,
    transient_resources: HashMap<ResourceHandle, TransientResource>,
    outputs: HashSet<ResourceHandle>,
    live: HashMap<ResourceHandle, Texture>,
    built: bool,
}

struct PassNode {
    pass: Box<dyn RenderPass>,
    reads: Vec<ResourceHandle>,
    writes: Vec<ResourceHandle>,
    creates: Vec<ResourceHandle>,
}

struct TransientResource {
    label: String,
    desc: TextureDesc,
    first_use: usize, // First pass that uses this resource
    last_use: usize,  // Last pass that uses this resource
}

impl<'a> RenderGraph<'a> {
    pub fn new() -> Self {
        Self {
            passes: Vec::new(),
            execution_order: Vec::new(),
            imported: HashMap::new(),
            transient_resources: HashMap::new(),
            outputs: HashSet::new(),
            live: HashMap::new(),
            built: false,
        }
    }

    /// Import an externally owned texture (read-only inside the graph)
    pub fn import(&mut self, name: &str, texture: &'a Texture) -> ResourceHandle {
        let handle = ResourceHandle::named(name);
        self.imported.insert(handle, texture);
        handle
    }

    /// Declare a transient resource
    pub fn declare_transient(&mut self, handle: ResourceHandle, label: &str, desc: TextureDesc) {
        self.transient_resources.insert(
            handle,
            TransientResource {
                label: label.to_string(),
                desc,
                first_use: usize::MAX,
                last_use: 0,
            },
        );
    }

    /// Keep a transient alive after execution so it can be taken out
    pub fn mark_output(&mut self, handle: ResourceHandle) {
        self.outputs.insert(handle);
    }

    /// Add a pass to the graph
    pub fn add_pass(&mut self, pass: impl RenderPass + 'static) -> PassId {
        let id = PassId(self.passes.len());

        let mut builder = PassResourceBuilder::new();
        pass.declare_resources(&mut builder);

        self.passes.push(PassNode {
            pass: Box::new(pass),
            reads: builder.reads,
            writes: builder.writes,
            creates: builder.creates,
        });
        self.built = false;
        id
    }

    /// Build the graph - validate declarations and determine execution order
    pub fn build(&mut self) -> Result<()> {
        log::debug!("Building render graph with {} passes", self.passes.len());

        // Collect ALL resource writers before building edges, so ordering is
        // independent of pass registration order.
        let mut resource_writers: HashMap<ResourceHandle, usize> = HashMap::new();
        for (i, pass) in self.passes.iter().enumerate() {
            for &resource in pass.writes.iter().chain(&pass.creates) {
                if self.imported.contains_key(&resource) {
                    return Err(Error::Graph(format!(
                        "pass '{}' writes imported resource {:?}",
                        pass.pass.name(),
                        resource
                    )));
                }
                if !self.transient_resources.contains_key(&resource) {
                    return Err(Error::Graph(format!(
                        "pass '{}' writes undeclared resource {:?}",
                        pass.pass.name(),
                        resource
                    )));
                }
                if let Some(&other) = resource_writers.get(&resource) {
                    if other != i {
                        return Err(Error::Graph(format!(
                            "resource {:?} is written by both '{}' and '{}'",
                            resource,
                            self.passes[other].pass.name(),
                            pass.pass.name()
                        )));
                    }
                }
                resource_writers.insert(resource, i);
            }
        }

        let mut in_degree = vec![0; self.passes.len()];
        let mut adj_list: Vec<Vec<usize>> = vec![Vec::new(); self.passes.len()];

        for (i, pass) in self.passes.iter().enumerate() {
            for &resource in &pass.reads {
                if let Some(&writer_idx) = resource_writers.get(&resource) {
                    if writer_idx != i {
                        adj_list[writer_idx].push(i);
                        in_degree[i] += 1;
                    }
                } else if !self.imported.contains_key(&resource) {
                    return Err(Error::Graph(format!(
                        "pass '{}' reads resource {:?} that nothing imports or writes",
                        pass.pass.name(),
                        resource
                    )));
                }
            }
        }

        // Topological sort (Kahn's algorithm, FIFO to preserve insertion order)
        let mut queue: VecDeque<usize> = (0..self.passes.len())
            .filter(|&i| in_degree[i] == 0)
            .collect();

        let mut order = Vec::new();

        while let Some(node) = queue.pop_front() {
            order.push(node);

            for &neighbor in &adj_list[node] {
                in_degree[neighbor] -= 1;
                if in_degree[neighbor] == 0 {
                    queue.push_back(neighbor);
                }
            }
        }

        if order.len() != self.passes.len() {
            return Err(Error::Graph(
                "Cyclic dependency detected in render graph".to_string(),
            ));
        }

        self.execution_order = order;

        for (i, &pass_idx) in self.execution_order.iter().enumerate() {
            log::trace!("  Pass {}: {}", i, self.passes[pass_idx].pass.name());
        }

        self.compute_resource_lifetimes();
        self.built = true;
        Ok(())
    }

    /// Compute lifetimes for transient resources
    fn compute_resource_lifetimes(&mut self) {
        let mut resource_usage: HashMap<ResourceHandle, (usize, usize)> = HashMap::new();

        for (exec_idx, &pass_idx) in self.execution_order.iter().enumerate() {
            let pass = &self.passes[pass_idx];

            for &res in pass.reads.iter().chain(&pass.writes).chain(&pass.creates) {
                resource_usage
                    .entry(res)
                    .and_modify(|(first, last)| {
                        *first = (*first).min(exec_idx);
                        *last = (*last).max(exec_idx);
                    })
                    .or_insert((exec_idx, exec_idx));
            }
        }

        for (handle, resource) in self.transient_resources.iter_mut() {
            if let Some(&(first, last)) = resource_usage.get(handle) {
                resource.first_use = first;
                resource.last_use = if self.outputs.contains(handle) {
                    usize::MAX
                } else {
                    last
                };
            }
        }
    }

    /// Names of the passes in execution order
    pub fn execution_order(&self) -> Vec<&str> {
        self.execution_order
            .iter()
            .map(|&i| self.passes[i].pass.name())
            .collect()
    }

    /// Execute the render graph
    pub fn execute(&mut self, ctx: &mut GraphContext) -> Result<()> {
        if !self.built {
            return Err(Error::Graph("execute called before build".to_string()));
        }
        log::trace!("Executing render graph (frame {})", ctx.frame);

        let execution_order = self.execution_order.clone();

        for (exec_idx, &pass_idx) in execution_order.iter().enumerate() {
            self.allocate_transient_resources(exec_idx, ctx.pool)?;

            let node = &mut self.passes[pass_idx];
            log::trace!("  Executing pass: {}", node.pass.name());
            let name = node.pass.name().to_string();
            let mut pass_ctx = PassContext {
                pass_name: &name,
                imported: &self.imported,
                transient: &mut self.live,
            };
            node.pass.execute(&mut pass_ctx)?;

            self.release_transient_resources(exec_idx, ctx.pool);
        }

        Ok(())
    }

    fn allocate_transient_resources(&mut self, exec_idx: usize, pool: &mut TexturePool) -> Result<()> {
        for (handle, resource) in &self.transient_resources {
            if resource.first_use == exec_idx {
                log::trace!("    Allocating transient resource '{}'", resource.label);
                let texture = pool.acquire(&resource.label, resource.desc)?;
                self.live.insert(*handle, texture);
            }
        }
        Ok(())
    }

    fn release_transient_resources(&mut self, exec_idx: usize, pool: &mut TexturePool) {
        for (handle, resource) in &self.transient_resources {
            if resource.last_use == exec_idx {
                if let Some(texture) = self.live.remove(handle) {
                    log::trace!("    Releasing transient resource '{}'", resource.label);
                    pool.release(texture);
                }
            }
        }
    }

    /// Take an output resource out of an executed graph
    pub fn take_output(&mut self, handle: ResourceHandle) -> Result<Texture> {
        if !self.outputs.contains(&handle) {
            return Err(Error::Graph(format!("resource {:?} is not a graph output", handle)));
        }
        self.live
            .remove(&handle)
            .ok_or_else(|| Error::Graph(format!("output {:?} was never produced", handle)))
    }
}

impl Default for RenderGraph<'_> {
    fn default() -> Self {
        Self::new()
    }
}

/// Context for graph execution
pub struct GraphContext<'p> {
    pub pool: &'p mut TexturePool,
    pub frame: u64,
}

/// Builder for declaring pass resource dependencies
pub struct PassResourceBuilder {
    reads: Vec<ResourceHandle>,
    writes: Vec<ResourceHandle>,
    creates: Vec<ResourceHandle>,
}

impl PassResourceBuilder {
    fn new() -> Self {
        Self {
            reads: Vec::new(),
            writes: Vec::new(),
            creates: Vec::new(),
        }
    }

    /// Declare that this pass reads a resource
    pub fn read(&mut self, resource: ResourceHandle) -> &mut Self {
        self.reads.push(resource);
        self
    }

    /// Declare that this pass writes to a resource
    pub fn write(&mut self, resource: ResourceHandle) -> &mut Self {
        self.writes.push(resource);
        self
    }

    /// Declare that this pass creates a transient resource
    pub fn create(&mut self, resource: ResourceHandle) -> &mut Self {
        self.creates.push(resource);
        self
    }
}
