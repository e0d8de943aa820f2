//! Domain - container of nodes, elements, constraints and load patterns

mod constraint;
mod load_pattern;
mod node;

pub use constraint::{MpConstraint, SpConstraint};
pub use load_pattern::{LoadPattern, NodalLoad, TimeSeries};
pub use node::Node;

use std::collections::BTreeMap;

use log::debug;

use crate::elements::Element;
use crate::error::{FEAError, FEAResult};

/// The finite element domain
#[derive(Debug, Default)]
pub struct Domain {
    nodes: BTreeMap<usize, Node>,
    elements: BTreeMap<usize, Box<dyn Element>>,
    sp_constraints: Vec<SpConstraint>,
    mp_constraints: Vec<MpConstraint>,
    load_patterns: BTreeMap<usize, LoadPattern>,
    current_time: f64,
    committed_time: f64,
}

fn collect_nodes<'a>(nodes: &'a BTreeMap<usize, Node>, tags: &[usize]) -> FEAResult<Vec<&'a Node>> {
    tags.iter()
        .map(|tag| nodes.get(tag).ok_or(FEAError::NodeNotFound(*tag)))
        .collect()
}

impl Domain {
    /// Create a new empty domain
    pub fn new() -> Self {
        Self::default()
    }

    // ========================
    // Model Building Methods
    // ========================

    /// Add a node to the domain
    pub fn add_node(&mut self, node: Node) -> FEAResult<()> {
        if self.nodes.contains_key(&node.tag()) {
            return Err(FEAError::DuplicateTag {
                collection: "nodes",
                tag: node.tag(),
            });
        }
        self.nodes.insert(node.tag(), node);
        Ok(())
    }

    /// Add an element; its nodes must already be present
    pub fn add_element(&mut self, element: impl Element + 'static) -> FEAResult<()> {
        let mut element: Box<dyn Element> = Box::new(element);
        let tag = element.tag();
        if self.elements.contains_key(&tag) {
            return Err(FEAError::DuplicateTag {
                collection: "elements",
                tag,
            });
        }
        let nodes = collect_nodes(&self.nodes, element.node_tags())?;
        element.set_domain(&nodes)?;
        self.elements.insert(tag, element);
        Ok(())
    }

    fn check_dof(&self, node: usize, dof: usize) -> FEAResult<()> {
        let ndf = self.nodes.get(&node).ok_or(FEAError::NodeNotFound(node))?.ndf();
        if dof >= ndf {
            return Err(FEAError::InvalidInput(format!(
                "DOF {} out of range for node {} with {} DOF",
                dof, node, ndf
            )));
        }
        Ok(())
    }

    pub fn add_sp_constraint(&mut self, sp: SpConstraint) -> FEAResult<()> {
        self.check_dof(sp.node, sp.dof)?;
        self.sp_constraints.push(sp);
        Ok(())
    }

    pub fn add_mp_constraint(&mut self, mp: MpConstraint) -> FEAResult<()> {
        for &dof in mp.retained_dofs() {
            self.check_dof(mp.retained_node(), dof)?;
        }
        for &dof in mp.constrained_dofs() {
            self.check_dof(mp.constrained_node(), dof)?;
        }
        self.mp_constraints.push(mp);
        Ok(())
    }

    pub fn add_load_pattern(&mut self, pattern: LoadPattern) -> FEAResult<()> {
        if self.load_patterns.contains_key(&pattern.tag()) {
            return Err(FEAError::DuplicateTag {
                collection: "load patterns",
                tag: pattern.tag(),
            });
        }
        for load in pattern.nodal_loads() {
            let node = self.nodes.get(&load.node).ok_or(FEAError::NodeNotFound(load.node))?;
            if load.values.len() != node.ndf() {
                return Err(FEAError::DofMismatch {
                    what: format!("nodal load on node {}", load.node),
                    expected: node.ndf(),
                    found: load.values.len(),
                });
            }
        }
        self.load_patterns.insert(pattern.tag(), pattern);
        Ok(())
    }

    // ========================
    // Accessors
    // ========================

    pub fn node(&self, tag: usize) -> Option<&Node> {
        self.nodes.get(&tag)
    }

    pub fn node_mut(&mut self, tag: usize) -> Option<&mut Node> {
        self.nodes.get_mut(&tag)
    }

    /// Nodes in ascending tag order
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn nodes_mut(&mut self) -> impl Iterator<Item = &mut Node> {
        self.nodes.values_mut()
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn element(&self, tag: usize) -> Option<&dyn Element> {
        self.elements.get(&tag).map(|e| e.as_ref())
    }

    /// Elements in ascending tag order
    pub fn elements(&self) -> impl Iterator<Item = &dyn Element> {
        self.elements.values().map(|e| e.as_ref())
    }

    pub fn num_elements(&self) -> usize {
        self.elements.len()
    }

    /// The nodes of an element, in the element's node order
    pub fn element_nodes(&self, element: &dyn Element) -> FEAResult<Vec<&Node>> {
        collect_nodes(&self.nodes, element.node_tags())
    }

    pub fn sp_constraints(&self) -> &[SpConstraint] {
        &self.sp_constraints
    }

    pub fn mp_constraints(&self) -> &[MpConstraint] {
        &self.mp_constraints
    }

    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    /// Time of the last commit
    pub fn committed_time(&self) -> f64 {
        self.committed_time
    }

    pub fn set_current_time(&mut self, time: f64) {
        self.current_time = time;
    }

    // ========================
    // State Methods
    // ========================

    /// Form the nodal unbalanced loads of all patterns at `time`
    pub fn apply_load(&mut self, time: f64) -> FEAResult<()> {
        for node in self.nodes.values_mut() {
            node.zero_unbalanced_load();
        }
        for pattern in self.load_patterns.values() {
            let factor = pattern.load_factor(time);
            for load in pattern.nodal_loads() {
                let node = self
                    .nodes
                    .get_mut(&load.node)
                    .ok_or(FEAError::NodeNotFound(load.node))?;
                node.add_unbalanced_load(&load.scaled(factor), 1.0)?;
            }
        }
        self.current_time = time;
        Ok(())
    }

    /// Push the nodal trial response into every element
    pub fn update(&mut self) -> FEAResult<()> {
        for element in self.elements.values_mut() {
            let nodes = collect_nodes(&self.nodes, element.node_tags())?;
            element.update(&nodes)?;
        }
        Ok(())
    }

    /// Update a single element
    pub fn update_element(&mut self, tag: usize) -> FEAResult<()> {
        let element = self
            .elements
            .get_mut(&tag)
            .ok_or(FEAError::ElementNotFound(tag))?;
        let nodes = collect_nodes(&self.nodes, element.node_tags())?;
        element.update(&nodes)
    }

    pub fn commit_element(&mut self, tag: usize) -> FEAResult<()> {
        self.elements
            .get_mut(&tag)
            .ok_or(FEAError::ElementNotFound(tag))?
            .commit_state()
    }

    pub fn commit(&mut self) -> FEAResult<()> {
        for node in self.nodes.values_mut() {
            node.commit_state();
        }
        for element in self.elements.values_mut() {
            element.commit_state()?;
        }
        self.committed_time = self.current_time;
        debug!("domain committed at time {}", self.committed_time);
        Ok(())
    }

    pub fn revert_to_last_commit(&mut self) -> FEAResult<()> {
        for node in self.nodes.values_mut() {
            node.revert_to_last_commit();
        }
        for element in self.elements.values_mut() {
            let nodes = collect_nodes(&self.nodes, element.node_tags())?;
            element.revert_to_last_commit(&nodes)?;
        }
        self.current_time = self.committed_time;
        Ok(())
    }

    pub fn revert_to_start(&mut self) -> FEAResult<()> {
        for node in self.nodes.values_mut() {
            node.revert_to_start();
        }
        for element in self.elements.values_mut() {
            element.revert_to_start()?;
        }
        self.current_time = 0.0;
        self.committed_time = 0.0;
        Ok(())
    }
}
