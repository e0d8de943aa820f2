//! Constraint handlers populate an [`AnalysisModel`] with DOF groups and FE
//! elements for the nodes and elements of its domain.
//!
//! Groups are tagged by node order and FE elements by element order, both
//! starting at 0.

use std::collections::HashMap;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::dof_group::{Column, DofGroup, Equation};
use super::fe_element::FeElement;
use super::model::AnalysisModel;
use super::transformation::Transform;
use crate::domain::MpConstraint;
use crate::error::{FEAError, FEAResult};
use crate::math::Mat;

pub trait ConstraintHandler {
    /// Add groups and FE elements to an empty model. Returns the number of
    /// constrained DOF.
    fn handle(&self, model: &mut AnalysisModel) -> FEAResult<usize>;
}

/// Which handler an analysis uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HandlerKind {
    Plain,
    #[default]
    Transformation,
}

impl ConstraintHandler for HandlerKind {
    fn handle(&self, model: &mut AnalysisModel) -> FEAResult<usize> {
        match self {
            HandlerKind::Plain => PlainHandler.handle(model),
            HandlerKind::Transformation => TransformationHandler.handle(model),
        }
    }
}

struct NodeInfo {
    tag: usize,
    ndf: usize,
}

struct ElementInfo {
    tag: usize,
    nodes: Vec<usize>,
    num_dof: usize,
}

/// Snapshot of the domain topology, taken before the model is mutated
struct Topology {
    nodes: Vec<NodeInfo>,
    elements: Vec<ElementInfo>,
    /// Node tag to group tag
    group_of: HashMap<usize, usize>,
}

impl Topology {
    fn of(model: &AnalysisModel) -> FEAResult<Self> {
        if model.num_dof_groups() > 0 || model.num_fe_elements() > 0 {
            return Err(FEAError::Configuration(
                "constraint handler requires an empty analysis model".to_string(),
            ));
        }
        let domain = model.domain();
        let nodes: Vec<NodeInfo> = domain
            .nodes()
            .map(|n| NodeInfo {
                tag: n.tag(),
                ndf: n.ndf(),
            })
            .collect();
        let elements = domain
            .elements()
            .map(|e| ElementInfo {
                tag: e.tag(),
                nodes: e.node_tags().to_vec(),
                num_dof: e.num_dof(),
            })
            .collect();
        let group_of = nodes.iter().enumerate().map(|(i, n)| (n.tag, i)).collect();
        Ok(Self {
            nodes,
            elements,
            group_of,
        })
    }

    fn group(&self, node: usize) -> FEAResult<usize> {
        self.group_of
            .get(&node)
            .copied()
            .ok_or(FEAError::NodeNotFound(node))
    }

    fn add_fe_elements(&self, model: &mut AnalysisModel) -> FEAResult<()> {
        for (tag, element) in self.elements.iter().enumerate() {
            let groups = element
                .nodes
                .iter()
                .map(|&n| self.group(n))
                .collect::<FEAResult<Vec<_>>>()?;
            let buffers = model.alloc_buffers(element.num_dof)?;
            model.add_fe_element(FeElement::new(tag, element.tag, groups, element.num_dof, buffers))?;
        }
        Ok(())
    }
}

/// Removes homogeneously restrained DOF from numbering. Multi-point
/// constraints are not supported and are skipped.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainHandler;

impl ConstraintHandler for PlainHandler {
    fn handle(&self, model: &mut AnalysisModel) -> FEAResult<usize> {
        let topology = Topology::of(model)?;
        for (tag, node) in topology.nodes.iter().enumerate() {
            let buffers = model.alloc_buffers(node.ndf)?;
            model.add_dof_group(DofGroup::new(tag, node.tag, node.ndf, buffers)?)?;
        }

        let sps = model.domain().sp_constraints().to_vec();
        let mut constrained = 0;
        for sp in &sps {
            if !sp.is_homogeneous() {
                warn!(
                    "plain handler: imposed value {} on node {} DOF {} is ignored",
                    sp.value, sp.node, sp.dof
                );
            }
            let tag = topology.group(sp.node)?;
            let group = model
                .dof_group_mut(tag)
                .ok_or(FEAError::DofGroupNotFound(tag))?;
            if group.native_id()[sp.dof] != Equation::Constrained {
                group.set_id(sp.dof, Equation::Constrained)?;
                constrained += 1;
            }
        }
        let num_mp = model.domain().mp_constraints().len();
        if num_mp > 0 {
            warn!(
                "plain handler: {} multi-point constraint(s) ignored, use the transformation handler",
                num_mp
            );
        }

        topology.add_fe_elements(model)?;
        debug!(
            "plain handler: {} DOF groups, {} constrained DOF",
            topology.nodes.len(),
            constrained
        );
        Ok(constrained)
    }
}

/// Eliminates restrained DOF and multi-point constrained DOF through
/// per-node transformations.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransformationHandler;

impl TransformationHandler {
    /// Transformation of a node with restrained DOF `fixed` and an optional
    /// constraint to a retained node with `retained_ndf` DOF
    fn build(
        ndf: usize,
        fixed: &[bool],
        mp: Option<(&MpConstraint, usize)>,
    ) -> (Vec<Equation>, Mat, Vec<Column>) {
        let mut slaved = vec![false; ndf];
        if let Some((mp, _)) = mp {
            for &d in mp.constrained_dofs() {
                slaved[d] = true;
            }
        }
        let own: Vec<usize> = (0..ndf).filter(|&d| !fixed[d] && !slaved[d]).collect();
        let retained_ndf = mp.map_or(0, |(_, n)| n);

        let mut columns: Vec<Column> = own.iter().map(|&d| Column::Own(d)).collect();
        columns.extend((0..retained_ndf).map(Column::Retained));

        let mut t = Mat::zeros(ndf, columns.len());
        for (k, &d) in own.iter().enumerate() {
            t[(d, k)] = 1.0;
        }
        if let Some((mp, _)) = mp {
            let c = mp.matrix();
            for (i, &d) in mp.constrained_dofs().iter().enumerate() {
                for (j, &r) in mp.retained_dofs().iter().enumerate() {
                    t[(d, own.len() + r)] = c[(i, j)];
                }
            }
        }

        let id = (0..ndf)
            .map(|d| {
                if fixed[d] || slaved[d] {
                    Equation::Constrained
                } else {
                    Equation::Pending
                }
            })
            .collect();
        (id, t, columns)
    }
}

impl ConstraintHandler for TransformationHandler {
    fn handle(&self, model: &mut AnalysisModel) -> FEAResult<usize> {
        let topology = Topology::of(model)?;
        let domain = model.domain();

        let mut fixed: HashMap<usize, Vec<bool>> = HashMap::new();
        for sp in domain.sp_constraints() {
            if !sp.is_homogeneous() {
                warn!(
                    "transformation handler: imposed value {} on node {} DOF {} is ignored",
                    sp.value, sp.node, sp.dof
                );
            }
            let ndf = domain.node(sp.node).ok_or(FEAError::NodeNotFound(sp.node))?.ndf();
            fixed.entry(sp.node).or_insert_with(|| vec![false; ndf])[sp.dof] = true;
        }

        let mut mps: HashMap<usize, MpConstraint> = HashMap::new();
        for mp in domain.mp_constraints() {
            if mps.insert(mp.constrained_node(), mp.clone()).is_some() {
                return Err(FEAError::Configuration(format!(
                    "node {} is constrained by more than one multi-point constraint",
                    mp.constrained_node()
                )));
            }
        }
        for mp in mps.values() {
            if mps.contains_key(&mp.retained_node()) {
                return Err(FEAError::Configuration(format!(
                    "retained node {} is itself constrained",
                    mp.retained_node()
                )));
            }
            if let Some(dofs) = fixed.get(&mp.constrained_node()) {
                if let Some(&d) = mp.constrained_dofs().iter().find(|&&d| dofs[d]) {
                    return Err(FEAError::Configuration(format!(
                        "DOF {} of node {} is both restrained and multi-point constrained",
                        d,
                        mp.constrained_node()
                    )));
                }
            }
        }

        let mut constrained = 0;
        for (tag, node) in topology.nodes.iter().enumerate() {
            let node_fixed = fixed.get(&node.tag);
            let node_mp = mps.get(&node.tag);
            let group = match (node_fixed, node_mp) {
                (None, None) => {
                    let buffers = model.alloc_buffers(node.ndf)?;
                    DofGroup::new(tag, node.tag, node.ndf, buffers)?
                }
                _ => {
                    let no_fixed = vec![false; node.ndf];
                    let fixed_dofs = node_fixed.unwrap_or(&no_fixed);
                    let retained = match node_mp {
                        Some(mp) => {
                            let ndf = model
                                .domain()
                                .node(mp.retained_node())
                                .ok_or(FEAError::NodeNotFound(mp.retained_node()))?
                                .ndf();
                            Some((mp, ndf))
                        }
                        None => None,
                    };
                    let (id, t, columns) = Self::build(node.ndf, fixed_dofs, retained);
                    constrained += id.iter().filter(|e| **e == Equation::Constrained).count();
                    let retained_group = node_mp
                        .map(|mp| topology.group(mp.retained_node()))
                        .transpose()?;
                    let buffers = model.alloc_buffers(columns.len())?;
                    DofGroup::transformed(
                        tag,
                        node.tag,
                        id,
                        Transform::Explicit(t),
                        columns,
                        retained_group,
                        buffers,
                    )?
                }
            };
            model.add_dof_group(group)?;
        }

        topology.add_fe_elements(model)?;
        debug!(
            "transformation handler: {} DOF groups, {} constrained DOF, {} multi-point constraints",
            topology.nodes.len(),
            constrained,
            mps.len()
        );
        Ok(constrained)
    }
}
