//! Analysis model - owns the domain, its DOF groups and FE elements
//!
//! Phase order for a new model: the constraint handler adds DOF groups and
//! FE elements, the numberer assigns equation numbers to the groups and then
//! calls [`AnalysisModel::finalize_ids`], which fills the transformed IDs of
//! constrained groups before every FE element takes its IDs.

use std::collections::HashMap;

use log::debug;

use super::dof_group::{Column, DofGroup, Equation};
use super::fe_element::FeElement;
use crate::domain::Domain;
use crate::error::{FEAError, FEAResult};
use crate::math::Vec as FEVec;
use crate::storage::{UnbalAndTangent, UnbalAndTangentStorage};
use crate::system::{Graph, MassOperator};

pub trait Tagged {
    fn tag(&self) -> usize;
}

impl Tagged for DofGroup {
    fn tag(&self) -> usize {
        DofGroup::tag(self)
    }
}

impl Tagged for FeElement {
    fn tag(&self) -> usize {
        FeElement::tag(self)
    }
}

/// Tag-indexed collection that iterates in insertion order
#[derive(Debug, Clone)]
pub struct TaggedStore<T> {
    collection: &'static str,
    items: Vec<T>,
    index: HashMap<usize, usize>,
}

impl<T: Tagged> TaggedStore<T> {
    pub fn new(collection: &'static str) -> Self {
        Self {
            collection,
            items: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn insert(&mut self, item: T) -> FEAResult<()> {
        let tag = item.tag();
        if self.index.contains_key(&tag) {
            return Err(FEAError::DuplicateTag {
                collection: self.collection,
                tag,
            });
        }
        self.index.insert(tag, self.items.len());
        self.items.push(item);
        Ok(())
    }

    pub fn get(&self, tag: usize) -> Option<&T> {
        self.index.get(&tag).map(|&i| &self.items[i])
    }

    pub fn get_mut(&mut self, tag: usize) -> Option<&mut T> {
        match self.index.get(&tag) {
            Some(&i) => Some(&mut self.items[i]),
            None => None,
        }
    }

    pub fn contains(&self, tag: usize) -> bool {
        self.index.contains_key(&tag)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.items.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.index.clear();
    }
}

/// Analysis model
#[derive(Debug)]
pub struct AnalysisModel {
    domain: Domain,
    groups: TaggedStore<DofGroup>,
    fe_elements: TaggedStore<FeElement>,
    storage: UnbalAndTangentStorage,
    num_eqn: usize,
}

impl AnalysisModel {
    pub fn new(domain: Domain) -> Self {
        Self {
            domain,
            groups: TaggedStore::new("DOF groups"),
            fe_elements: TaggedStore::new("FE elements"),
            storage: UnbalAndTangentStorage::new(),
            num_eqn: 0,
        }
    }

    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    pub fn domain_mut(&mut self) -> &mut Domain {
        &mut self.domain
    }

    /// Give the domain back, dropping the analysis objects
    pub fn into_domain(mut self) -> Domain {
        self.clear_all();
        self.domain
    }

    /// Shared working buffers for an object with `size` DOF
    pub fn alloc_buffers(&mut self, size: usize) -> FEAResult<UnbalAndTangent> {
        self.storage.alloc(size)
    }

    pub fn storage(&self) -> &UnbalAndTangentStorage {
        &self.storage
    }

    pub fn add_dof_group(&mut self, group: DofGroup) -> FEAResult<()> {
        let node_tag = group.node_tag();
        let group_tag = group.tag();
        let node = self
            .domain
            .node(node_tag)
            .ok_or(FEAError::NodeNotFound(node_tag))?;
        if node.ndf() != group.num_dof() {
            return Err(FEAError::DofMismatch {
                what: format!("DOF group {} for node {}", group_tag, node_tag),
                expected: node.ndf(),
                found: group.num_dof(),
            });
        }
        self.groups.insert(group)?;
        if let Some(node) = self.domain.node_mut(node_tag) {
            node.dof_group = Some(group_tag);
        }
        Ok(())
    }

    pub fn add_fe_element(&mut self, fe: FeElement) -> FEAResult<()> {
        for &tag in fe.dof_groups() {
            if !self.groups.contains(tag) {
                return Err(FEAError::DofGroupNotFound(tag));
            }
        }
        if self.domain.element(fe.element_tag()).is_none() {
            return Err(FEAError::ElementNotFound(fe.element_tag()));
        }
        self.fe_elements.insert(fe)
    }

    pub fn dof_group(&self, tag: usize) -> Option<&DofGroup> {
        self.groups.get(tag)
    }

    pub fn dof_group_mut(&mut self, tag: usize) -> Option<&mut DofGroup> {
        self.groups.get_mut(tag)
    }

    pub fn fe_element(&self, tag: usize) -> Option<&FeElement> {
        self.fe_elements.get(tag)
    }

    /// DOF groups in insertion order
    pub fn dof_groups(&self) -> std::slice::Iter<'_, DofGroup> {
        self.groups.iter()
    }

    pub fn dof_groups_mut(&mut self) -> std::slice::IterMut<'_, DofGroup> {
        self.groups.iter_mut()
    }

    /// FE elements in insertion order
    pub fn fe_elements(&self) -> std::slice::Iter<'_, FeElement> {
        self.fe_elements.iter()
    }

    pub fn num_dof_groups(&self) -> usize {
        self.groups.len()
    }

    pub fn num_fe_elements(&self) -> usize {
        self.fe_elements.len()
    }

    pub fn set_num_eqn(&mut self, num_eqn: usize) {
        self.num_eqn = num_eqn;
    }

    pub fn num_eqn(&self) -> usize {
        self.num_eqn
    }

    /// Fill transformed group IDs, then hand every FE element its IDs
    pub fn finalize_ids(&mut self) -> FEAResult<()> {
        let mut mod_ids = Vec::new();
        for (i, group) in self.groups.iter().enumerate() {
            if group.get_t().is_identity() {
                continue;
            }
            let retained = match group.retained_group() {
                Some(tag) => Some(
                    self.groups
                        .get(tag)
                        .ok_or(FEAError::DofGroupNotFound(tag))?
                        .native_id(),
                ),
                None => None,
            };
            let mut mod_id = Vec::with_capacity(group.columns().len());
            for column in group.columns() {
                let eq = match (*column, retained) {
                    (Column::Own(dof), _) => group.native_id()[dof],
                    (Column::Retained(dof), Some(ids)) => *ids.get(dof).ok_or_else(|| {
                        FEAError::InvalidInput(format!(
                            "retained DOF {} out of range for DOF group {}",
                            dof,
                            group.tag()
                        ))
                    })?,
                    (Column::Retained(_), None) => Equation::Constrained,
                };
                mod_id.push(eq);
            }
            mod_ids.push((i, mod_id));
        }
        let groups = &mut self.groups;
        for (i, mod_id) in mod_ids {
            if let Some(group) = groups.iter_mut().nth(i) {
                group.set_mod_id(mod_id);
            }
        }

        let groups = &self.groups;
        let storage = &mut self.storage;
        for fe in self.fe_elements.iter_mut() {
            let members = fe
                .dof_groups()
                .iter()
                .map(|&tag| groups.get(tag).ok_or(FEAError::DofGroupNotFound(tag)))
                .collect::<FEAResult<Vec<_>>>()?;
            let size = fe.set_id(&members)?;
            if fe.buffer_size() != size {
                fe.set_buffers(storage.alloc(size)?);
            }
        }
        debug!(
            "IDs finalized for {} DOF groups and {} FE elements",
            self.groups.len(),
            self.fe_elements.len()
        );
        Ok(())
    }

    /// Connectivity of the equations through FE elements and DOF groups
    pub fn dof_graph(&self) -> Graph {
        let mut graph = Graph::new(self.num_eqn);
        let mut eqns = Vec::new();
        let ids = self
            .fe_elements
            .iter()
            .map(FeElement::id)
            .chain(self.groups.iter().map(DofGroup::id));
        for id in ids {
            eqns.clear();
            eqns.extend(id.iter().filter_map(Equation::number));
            graph.add_clique(&eqns);
        }
        graph
    }

    pub fn apply_load_domain(&mut self, time: f64) -> FEAResult<()> {
        self.domain.apply_load(time)
    }

    pub fn update_domain(&mut self) -> FEAResult<()> {
        self.domain.update()
    }

    /// Step the domain by `dt` from its committed time to `time`, apply the
    /// loads there and update.
    ///
    /// `time` must equal the committed time plus `dt`.
    pub fn update_domain_time(&mut self, time: f64, dt: f64) -> FEAResult<()> {
        let from = self.domain.committed_time();
        if !dt.is_finite() || dt < 0.0 || (from + dt - time).abs() > 1e-12 * time.abs().max(1.0) {
            return Err(FEAError::InvalidInput(format!(
                "time step {} from committed time {} does not reach {}",
                dt, from, time
            )));
        }
        debug!("updating domain from time {} to {} (dt = {})", from, time, dt);
        self.domain.apply_load(time)?;
        self.domain.update()
    }

    pub fn commit_domain(&mut self) -> FEAResult<()> {
        self.domain.commit()
    }

    pub fn revert_domain_to_last_commit(&mut self) -> FEAResult<()> {
        self.domain.revert_to_last_commit()
    }

    /// Push system response vectors to the nodes
    pub fn set_response(&mut self, disp: &FEVec, vel: &FEVec, accel: &FEVec) -> FEAResult<()> {
        for x in [disp, vel, accel] {
            self.check_system_vector(x)?;
        }
        for group in self.groups.iter() {
            let node = self
                .domain
                .node_mut(group.node_tag())
                .ok_or(FEAError::NodeNotFound(group.node_tag()))?;
            group.set_node_disp(node, disp)?;
            group.set_node_vel(node, vel)?;
            group.set_node_accel(node, accel)?;
        }
        Ok(())
    }

    /// Push system displacements to the nodes
    pub fn set_displacements(&mut self, disp: &FEVec) -> FEAResult<()> {
        self.check_system_vector(disp)?;
        for group in self.groups.iter() {
            let node = self
                .domain
                .node_mut(group.node_tag())
                .ok_or(FEAError::NodeNotFound(group.node_tag()))?;
            group.set_node_disp(node, disp)?;
        }
        Ok(())
    }

    /// Store the mode shapes of all nodes, `vectors[k]` is mode `k + 1`
    pub fn set_eigenvectors(&mut self, vectors: &[FEVec]) -> FEAResult<()> {
        for x in vectors {
            self.check_system_vector(x)?;
        }
        for node in self.domain.nodes_mut() {
            node.set_num_eigenvectors(vectors.len());
        }
        for group in self.groups.iter() {
            let node = self
                .domain
                .node_mut(group.node_tag())
                .ok_or(FEAError::NodeNotFound(group.node_tag()))?;
            for (k, x) in vectors.iter().enumerate() {
                group.set_eigenvector(node, k + 1, x)?;
            }
        }
        Ok(())
    }

    fn check_system_vector(&self, x: &FEVec) -> FEAResult<()> {
        if x.len() != self.num_eqn {
            return Err(FEAError::DofMismatch {
                what: "system vector".to_string(),
                expected: self.num_eqn,
                found: x.len(),
            });
        }
        Ok(())
    }

    /// Remove all DOF groups and FE elements and release the buffer pool
    pub fn clear_all(&mut self) {
        self.groups.clear();
        self.fe_elements.clear();
        self.storage.clear();
        self.num_eqn = 0;
        for node in self.domain.nodes_mut() {
            node.dof_group = None;
        }
    }
}

impl MassOperator for AnalysisModel {
    /// Matrix-free `y = M x` over all FE elements and DOF groups
    fn mass_product(&self, x: &FEVec, y: &mut FEVec) -> FEAResult<()> {
        self.check_system_vector(x)?;
        self.check_system_vector(y)?;
        y.fill(0.0);
        for fe in self.fe_elements.iter() {
            let f = fe.get_m_force(&self.domain, x, 1.0)?;
            scatter(y, fe.id(), &f);
        }
        for group in self.groups.iter() {
            let f = group.get_m_force(&self.domain, x, 1.0)?;
            scatter(y, group.id(), &f);
        }
        Ok(())
    }
}

fn scatter(y: &mut FEVec, id: &[Equation], f: &FEVec) {
    for (e, v) in id.iter().zip(f.iter()) {
        if let Some(n) = e.number() {
            y[n] += v;
        }
    }
}
