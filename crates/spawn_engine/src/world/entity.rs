use std::any::Any;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityId(pub u64);

#[derive(Debug, Default)]
pub struct EntityIdAllocator {
    next: u64,
}

impl EntityIdAllocator {
    pub fn allocate(&mut self) -> EntityId {
        let id = EntityId(self.next);
        self.next = self.next.saturating_add(1);
        id
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

impl fmt::Display for Vec3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// Behavior instance attached to a limb. Implemented for every `Debug + 'static`
/// type so component structs need no boilerplate.
pub trait Capability: fmt::Debug + 'static {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: fmt::Debug + 'static> Capability for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[derive(Debug)]
pub struct AttachedCapability {
    type_name: String,
    instance: Box<dyn Capability>,
}

impl AttachedCapability {
    pub(crate) fn new(type_name: &str, instance: Box<dyn Capability>) -> Self {
        Self {
            type_name: type_name.to_string(),
            instance,
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn instance(&self) -> &dyn Capability {
        &*self.instance
    }

    pub(crate) fn instance_mut(&mut self) -> &mut dyn Capability {
        &mut *self.instance
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        (*self.instance).as_any().downcast_ref::<T>()
    }

    pub fn downcast_mut<T: Any>(&mut self) -> Option<&mut T> {
        (*self.instance).as_any_mut().downcast_mut::<T>()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LimbIndex(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CapabilityRef {
    pub limb: LimbIndex,
    pub slot: usize,
}

#[derive(Debug)]
pub struct LimbNode {
    pub name: String,
    pub parent: Option<LimbIndex>,
    pub owner: EntityId,
    children: Vec<LimbIndex>,
    capabilities: Vec<AttachedCapability>,
}

impl LimbNode {
    pub fn children(&self) -> &[LimbIndex] {
        &self.children
    }

    pub fn capabilities(&self) -> &[AttachedCapability] {
        &self.capabilities
    }

    pub fn capabilities_mut(&mut self) -> &mut [AttachedCapability] {
        &mut self.capabilities
    }
}

#[derive(Debug)]
pub struct SpawnedEntity {
    pub id: EntityId,
    pub name: String,
    pub position: Vec3,
    limbs: Vec<LimbNode>,
    root_limbs: Vec<LimbIndex>,
    capability_index: Vec<CapabilityRef>,
}

impl SpawnedEntity {
    pub fn new(id: EntityId, name: &str, position: Vec3) -> Self {
        Self {
            id,
            name: name.to_string(),
            position,
            limbs: Vec::new(),
            root_limbs: Vec::new(),
            capability_index: Vec::new(),
        }
    }

    pub fn add_limb(&mut self, name: &str, parent: Option<LimbIndex>) -> LimbIndex {
        let index = LimbIndex(self.limbs.len());
        self.limbs.push(LimbNode {
            name: name.to_string(),
            parent,
            owner: self.id,
            children: Vec::new(),
            capabilities: Vec::new(),
        });
        match parent.and_then(|parent| self.limbs.get_mut(parent.0)) {
            Some(parent_node) => parent_node.children.push(index),
            None => self.root_limbs.push(index),
        }
        index
    }

    pub(crate) fn attach(
        &mut self,
        limb: LimbIndex,
        capability: AttachedCapability,
    ) -> Option<CapabilityRef> {
        let node = self.limbs.get_mut(limb.0)?;
        node.capabilities.push(capability);
        Some(CapabilityRef {
            limb,
            slot: node.capabilities.len() - 1,
        })
    }

    pub fn limbs(&self) -> &[LimbNode] {
        &self.limbs
    }

    pub fn limb(&self, index: LimbIndex) -> Option<&LimbNode> {
        self.limbs.get(index.0)
    }

    pub fn limb_mut(&mut self, index: LimbIndex) -> Option<&mut LimbNode> {
        self.limbs.get_mut(index.0)
    }

    pub fn root_limbs(&self) -> &[LimbIndex] {
        &self.root_limbs
    }

    pub fn find_limb(&self, name: &str) -> Option<LimbIndex> {
        self.limbs
            .iter()
            .position(|limb| limb.name == name)
            .map(LimbIndex)
    }

    pub fn owner_of(&self, limb: LimbIndex) -> Option<EntityId> {
        self.limb(limb).map(|node| node.owner)
    }

    pub fn depth_of(&self, limb: LimbIndex) -> Option<usize> {
        let mut depth = 0;
        let mut current = self.limb(limb)?;
        while let Some(parent) = current.parent {
            current = self.limb(parent)?;
            depth += 1;
        }
        Some(depth)
    }

    /// Rebuilds the capability index with a depth-first walk over the finished
    /// graph. Call after attaching or removing capabilities.
    pub fn refresh_capabilities(&mut self) {
        let mut index = Vec::new();
        let mut stack = self.root_limbs.iter().rev().copied().collect::<Vec<_>>();
        while let Some(limb) = stack.pop() {
            let Some(node) = self.limbs.get(limb.0) else {
                continue;
            };
            index.extend((0..node.capabilities.len()).map(|slot| CapabilityRef { limb, slot }));
            stack.extend(node.children.iter().rev().copied());
        }
        self.capability_index = index;
    }

    pub fn capability_refs(&self) -> &[CapabilityRef] {
        &self.capability_index
    }

    pub fn capability(&self, reference: CapabilityRef) -> Option<&AttachedCapability> {
        self.limb(reference.limb)?.capabilities.get(reference.slot)
    }

    pub fn capabilities(&self) -> impl Iterator<Item = &AttachedCapability> + '_ {
        self.capability_index
            .iter()
            .filter_map(|reference| self.capability(*reference))
    }

    pub fn capabilities_of<T: Any>(&self) -> impl Iterator<Item = &T> + '_ {
        self.capabilities()
            .filter_map(|capability| capability.downcast_ref::<T>())
    }
}
