use hashbrown::HashSet;

use crate::types::{TriangleId, Triangles, VertexId};

/// Defines which phases of the Triangulation are recorded
#[derive(Debug, Clone)]
pub enum PhaseRecord {
    /// Records all the phases
    All,
    /// Records the steps during the specified phase
    In(TriangulationPhase),
    /// Records the steps during the specified phases
    InAny(HashSet<TriangulationPhase>),
}

/// Defines which steps of the Triangulation are recorded. One step is one input vertex.
#[derive(Debug, Clone)]
pub enum StepsRecord {
    /// Records all the steps
    All,
    /// Records all the steps after the specified one (inclusive)
    From(usize),
    /// Records all the steps until the specified one (inclusive)
    Until(usize),
    /// Records all the steps between the specified ones (inclusive)
    Between(usize, usize),
}

#[derive(Debug, Clone)]
pub struct DebugConfiguration {
    pub phase_record: PhaseRecord,
    pub steps_record: StepsRecord,
    /// [None] means that it won't force an early exit
    pub force_end_at_step: Option<usize>,
}
impl Default for DebugConfiguration {
    fn default() -> Self {
        Self {
            phase_record: PhaseRecord::All,
            steps_record: StepsRecord::All,
            force_end_at_step: Default::default(),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum TriangulationPhase {
    ContainerTriangle,
    RemoveBadTriangles,
    FillCavity,
    RemoveWrapping,
}

pub struct DebugSnapshot {
    pub step: usize,
    pub triangulation_phase: TriangulationPhase,
    /// Vertex being inserted, if any
    pub vertex: Option<VertexId>,
    /// Triangles removed or created during this phase, as ids in `triangles` (for created ones)
    /// or in the previous snapshot (for removed ones)
    pub changed_ids: Vec<TriangleId>,
    pub triangles: Triangles,
}
impl DebugSnapshot {
    pub(crate) fn new(
        step: usize,
        triangulation_phase: TriangulationPhase,
        vertex: Option<VertexId>,
        triangles: Triangles,
        changed_ids: Vec<TriangleId>,
    ) -> Self {
        Self {
            step,
            triangulation_phase,
            vertex,
            triangles,
            changed_ids,
        }
    }
}

pub struct DebugContext {
    pub config: DebugConfiguration,
    pub snapshots: Vec<DebugSnapshot>,
    pub current_step: usize,
}

impl DebugContext {
    pub(crate) fn new(config: DebugConfiguration) -> Self {
        Self {
            config,
            snapshots: Vec::new(),
            current_step: 0,
        }
    }

    fn should_record(&self, phase: TriangulationPhase) -> bool {
        let record_phase = match &self.config.phase_record {
            PhaseRecord::All => true,
            PhaseRecord::InAny(phases) => phases.contains(&phase),
            PhaseRecord::In(rec_phase) => phase == *rec_phase,
        };
        record_phase
            && match self.config.steps_record {
                StepsRecord::All => true,
                StepsRecord::From(from) => self.current_step >= from,
                StepsRecord::Until(to) => self.current_step <= to,
                StepsRecord::Between(from, to) => {
                    self.current_step >= from && self.current_step <= to
                }
            }
    }

    pub(crate) fn push_snapshot(
        &mut self,
        phase: TriangulationPhase,
        vertex: Option<VertexId>,
        triangles: &Triangles,
        changed_ids: &[TriangleId],
    ) {
        if self.should_record(phase) {
            self.snapshots.push(DebugSnapshot::new(
                self.current_step,
                phase,
                vertex,
                triangles.clone(),
                changed_ids.to_vec(),
            ));
        }
    }

    /// Returns true if the algorithm should stop
    pub(crate) fn advance_step(&mut self) -> bool {
        self.current_step += 1;
        match self.config.force_end_at_step {
            Some(end_step) => self.current_step > end_step,
            None => false,
        }
    }
}

///////////////////////////////////////////////////////////
///                                                     ///
///                        Tests                        ///
///                                                     ///
///////////////////////////////////////////////////////////
