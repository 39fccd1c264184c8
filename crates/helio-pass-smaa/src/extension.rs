//! Host integration: the post-process extension point and module lifecycle

use crate::lut::{LookupTables, TableSource};
use crate::pipeline::{FrameContext, SmaaPipeline};
use crate::settings::SettingsResolver;
use crate::texture::{ScreenPassTexture, Texture};
use crate::tunables::Tunables;
use crate::{Error, Result};
use std::sync::Arc;

/// Name the SMAA extension registers under
pub const SMAA_EXTENSION_NAME: &str = "SMAA";

/// What the host hands each extension at the anti-aliasing slot
pub struct PostProcessInputs<'a> {
    pub scene_color: ScreenPassTexture<'a>,
    pub scene_depth: Option<&'a Texture>,
}

impl<'a> PostProcessInputs<'a> {
    pub fn new(scene_color: ScreenPassTexture<'a>) -> Self {
        Self {
            scene_color,
            scene_depth: None,
        }
    }

    pub fn with_depth(mut self, depth: &'a Texture) -> Self {
        self.scene_depth = Some(depth);
        self
    }
}

/// A post-process hook a host calls once per view per frame
pub trait ViewExtension: Send + Sync {
    fn name(&self) -> &str;

    /// Cheap pre-check; inactive extensions are skipped entirely
    fn is_active_this_frame(&self) -> bool {
        true
    }

    /// Return the scene color for the next stage, either the input itself or
    /// a new texture
    fn post_process<'a>(&self, frame: &FrameContext, inputs: PostProcessInputs<'a>) -> Result<ScreenPassTexture<'a>>;
}

/// Runs the SMAA chain at the host's anti-aliasing slot
pub struct SmaaViewExtension {
    resolver: SettingsResolver,
    pipeline: SmaaPipeline,
}

impl SmaaViewExtension {
    pub fn new(resolver: SettingsResolver, pipeline: SmaaPipeline) -> Self {
        Self { resolver, pipeline }
    }

    pub fn pipeline(&self) -> &SmaaPipeline {
        &self.pipeline
    }

    pub fn resolver(&self) -> &SettingsResolver {
        &self.resolver
    }
}

impl ViewExtension for SmaaViewExtension {
    fn name(&self) -> &str {
        SMAA_EXTENSION_NAME
    }

    // No is_active_this_frame override: the enable flag is checked in
    // post_process against the invocation's single settings snapshot.

    fn post_process<'a>(&self, frame: &FrameContext, inputs: PostProcessInputs<'a>) -> Result<ScreenPassTexture<'a>> {
        let settings = self.resolver.resolve();
        if !SmaaPipeline::should_run(frame, &settings) {
            return Ok(inputs.scene_color);
        }
        if !inputs.scene_color.is_valid() {
            log::warn!(
                "SMAA skipped for frame {}: scene color view rect {:?} is not usable",
                frame.frame,
                inputs.scene_color.view_rect
            );
            return Ok(inputs.scene_color);
        }

        let output = self
            .pipeline
            .run(frame, &inputs.scene_color, inputs.scene_depth, &settings)?;
        Ok(output)
    }
}

/// Ordered set of view extensions, keyed by name
#[derive(Default)]
pub struct ExtensionRegistry {
    extensions: Vec<Box<dyn ViewExtension>>,
}

impl ExtensionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an extension; names must be unique
    pub fn register(&mut self, extension: Box<dyn ViewExtension>) -> Result<()> {
        let name = extension.name();
        if self.contains(name) {
            return Err(Error::Config(format!("View extension '{}' is already registered", name)));
        }
        log::debug!("Registered view extension '{}'", name);
        self.extensions.push(extension);
        Ok(())
    }

    pub fn unregister(&mut self, name: &str) -> Result<Box<dyn ViewExtension>> {
        let index = self
            .extensions
            .iter()
            .position(|e| e.name() == name)
            .ok_or_else(|| Error::Config(format!("View extension '{}' not found", name)))?;
        log::debug!("Unregistered view extension '{}'", name);
        Ok(self.extensions.remove(index))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.extensions.iter().any(|e| e.name() == name)
    }

    pub fn get(&self, name: &str) -> Option<&dyn ViewExtension> {
        self.extensions.iter().find(|e| e.name() == name).map(|e| &**e)
    }

    pub fn len(&self) -> usize {
        self.extensions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }

    /// Chain every active extension in registration order
    pub fn post_process<'a>(
        &self,
        frame: &FrameContext,
        scene_color: ScreenPassTexture<'a>,
        scene_depth: Option<&'a Texture>,
    ) -> Result<ScreenPassTexture<'a>> {
        let mut current = scene_color;
        for extension in &self.extensions {
            if !extension.is_active_this_frame() {
                continue;
            }
            current = extension.post_process(frame, PostProcessInputs { scene_color: current, scene_depth })?;
        }
        Ok(current)
    }
}

/// Startup parameters for [`SmaaModule`]
pub struct SmaaModuleConfig {
    pub tables: TableSource,
    pub tunables: Arc<Tunables>,
}

impl SmaaModuleConfig {
    pub fn new(tables: TableSource, tunables: Arc<Tunables>) -> Self {
        Self { tables, tunables }
    }
}

impl Default for SmaaModuleConfig {
    fn default() -> Self {
        Self {
            tables: TableSource::Baked,
            tunables: Arc::new(Tunables::new()),
        }
    }
}

/// Owns the SMAA extension's lifetime inside a host
pub struct SmaaModule {
    tunables: Arc<Tunables>,
    tables: Arc<LookupTables>,
}

impl SmaaModule {
    /// Load the lookup tables and register the extension
    pub fn startup(config: SmaaModuleConfig, registry: &mut ExtensionRegistry) -> Result<Self> {
        let tables = Arc::new(LookupTables::new(config.tables));
        tables.load();

        let extension = SmaaViewExtension::new(
            SettingsResolver::new(config.tunables.clone()),
            SmaaPipeline::new(tables.clone()),
        );
        registry.register(Box::new(extension))?;

        log::info!("SMAA module started (tables: {:?})", tables.source());
        Ok(Self {
            tunables: config.tunables,
            tables,
        })
    }

    /// Remove the extension; the module is consumed
    pub fn shutdown(self, registry: &mut ExtensionRegistry) -> Result<()> {
        registry.unregister(SMAA_EXTENSION_NAME)?;
        log::info!("SMAA module shut down");
        Ok(())
    }

    pub fn tunables(&self) -> &Arc<Tunables> {
        &self.tunables
    }

    pub fn tables(&self) -> &Arc<LookupTables> {
        &self.tables
    }
}
