use crate::{
    algorithms::TraceOptions,
    edit::EditConfig,
    labels::RenumberPolicy,
    neighbors::NeighborConfig,
    pipeline::{FinalizeOptions, Pipeline},
};

/// Builder for creating pipelines with a fluent API
#[derive(Debug, Clone, Default)]
pub struct PipelineBuilder {
    edit: EditConfig,
    finalize: FinalizeOptions,
    neighbors: Option<NeighborConfig>,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole edit configuration
    pub fn with_edit_config(mut self, edit: EditConfig) -> Self {
        self.edit = edit;
        self
    }

    pub fn with_trace_options(mut self, trace: TraceOptions) -> Self {
        self.edit.trace = trace;
        self
    }

    /// Trace every boundary pixel, no thinning
    pub fn exact_chains(self) -> Self {
        self.with_trace_options(TraceOptions::exact())
    }

    pub fn renumber(mut self, policy: RenumberPolicy) -> Self {
        self.edit.renumber = policy;
        self
    }

    /// Also produce object outlines
    pub fn with_outline(mut self) -> Self {
        self.finalize.outline = true;
        self
    }

    /// Measure neighbours of the committed objects
    pub fn measure_neighbors(mut self, config: NeighborConfig) -> Self {
        self.neighbors = Some(config);
        self
    }

    pub fn build(self) -> Pipeline {
        Pipeline::new(self.edit, self.finalize, self.neighbors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::neighbors::DistanceMode;

    #[test]
    fn test_builder_info() {
        let pipeline = PipelineBuilder::new()
            .exact_chains()
            .renumber(RenumberPolicy::RetainOriginalIds)
            .with_outline()
            .measure_neighbors(NeighborConfig::new("Nuclei", DistanceMode::Within { distance: 3 }))
            .build();
        assert_eq!(
            pipeline.info(),
            "Pipeline: renumber retain_original_ids, outline true, neighbors 3"
        );
        assert_eq!(
            Pipeline::default().info(),
            "Pipeline: renumber renumber_consecutively, outline false, neighbors off"
        );
    }
}
