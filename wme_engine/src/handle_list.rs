//! Ordered arena handing out generation-checked handles.
//!
//! A frame owns its subframes through a [`HandleList`]; scripts only ever see
//! [`ListHandle`]s. Removing an element bumps its slot generation, so a handle
//! kept by a script afterwards resolves to nothing instead of to whatever
//! reuses the slot.

use std::sync::atomic::{AtomicU32, Ordering};

use wme_persist::{Persist, PersistError, PersistMgr};

static NEXT_LIST_ID: AtomicU32 = AtomicU32::new(1);

/// Stable reference to one element of one [`HandleList`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListHandle {
    list: u32,
    index: u32,
    generation: u32,
}

pub type SubframeHandle = ListHandle;

impl ListHandle {
    /// Rebuilds a handle from the parts a script host stored.
    pub fn from_raw(list: u32, index: u32, generation: u32) -> Self {
        Self {
            list,
            index,
            generation,
        }
    }

    pub fn into_raw(self) -> (u32, u32, u32) {
        (self.list, self.index, self.generation)
    }
}

#[derive(Debug, Clone)]
struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

#[derive(Debug, Clone)]
pub struct HandleList<T> {
    id: u32,
    slots: Vec<Slot<T>>,
    /// Slot indices in list order.
    order: Vec<u32>,
    free: Vec<u32>,
}

impl<T> Default for HandleList<T> {
    fn default() -> Self {
        Self {
            id: NEXT_LIST_ID.fetch_add(1, Ordering::Relaxed),
            slots: Vec::new(),
            order: Vec::new(),
            free: Vec::new(),
        }
    }
}

impl<T> HandleList<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn push(&mut self, value: T) -> ListHandle {
        self.insert(self.order.len(), value)
    }

    /// Inserts at `position`, appending when it is past the end.
    pub fn insert(&mut self, position: usize, value: T) -> ListHandle {
        let index = match self.free.pop() {
            Some(index) => {
                self.slots[index as usize].value = Some(value);
                index
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    value: Some(value),
                });
                (self.slots.len() - 1) as u32
            }
        };
        let position = position.min(self.order.len());
        self.order.insert(position, index);
        self.handle_for(index)
    }

    pub fn get(&self, handle: ListHandle) -> Option<&T> {
        let index = self.resolve(handle)?;
        self.slots[index].value.as_ref()
    }

    pub fn get_mut(&mut self, handle: ListHandle) -> Option<&mut T> {
        let index = self.resolve(handle)?;
        self.slots[index].value.as_mut()
    }

    pub fn contains(&self, handle: ListHandle) -> bool {
        self.resolve(handle).is_some()
    }

    pub fn handle_at(&self, position: usize) -> Option<ListHandle> {
        self.order.get(position).map(|index| self.handle_for(*index))
    }

    pub fn at(&self, position: usize) -> Option<&T> {
        let index = *self.order.get(position)?;
        self.slots[index as usize].value.as_ref()
    }

    pub fn at_mut(&mut self, position: usize) -> Option<&mut T> {
        let index = *self.order.get(position)?;
        self.slots[index as usize].value.as_mut()
    }

    pub fn position(&self, handle: ListHandle) -> Option<usize> {
        let index = self.resolve(handle)? as u32;
        self.order.iter().position(|slot| *slot == index)
    }

    pub fn remove(&mut self, handle: ListHandle) -> Option<T> {
        let position = self.position(handle)?;
        self.remove_at(position)
    }

    pub fn remove_at(&mut self, position: usize) -> Option<T> {
        if position >= self.order.len() {
            return None;
        }
        let index = self.order.remove(position);
        let slot = &mut self.slots[index as usize];
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(index);
        slot.value.take()
    }

    /// Removes everything, invalidating every outstanding handle.
    pub fn drain(&mut self) -> Vec<T> {
        let positions = self.order.len();
        (0..positions).filter_map(|_| self.remove_at(0)).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ListHandle, &T)> + '_ {
        self.order.iter().filter_map(move |index| {
            let slot = &self.slots[*index as usize];
            slot.value.as_ref().map(|value| (self.handle_for(*index), value))
        })
    }

    pub fn values(&self) -> impl Iterator<Item = &T> + '_ {
        self.iter().map(|(_, value)| value)
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut T> + '_ {
        let order = &self.order;
        let mut slots: Vec<Option<&mut T>> =
            self.slots.iter_mut().map(|slot| slot.value.as_mut()).collect();
        order
            .iter()
            .filter_map(|index| slots.get_mut(*index as usize).and_then(Option::take))
            .collect::<Vec<_>>()
            .into_iter()
    }

    fn handle_for(&self, index: u32) -> ListHandle {
        ListHandle {
            list: self.id,
            index,
            generation: self.slots[index as usize].generation,
        }
    }

    fn resolve(&self, handle: ListHandle) -> Option<usize> {
        if handle.list != self.id {
            return None;
        }
        let slot = self.slots.get(handle.index as usize)?;
        (slot.generation == handle.generation && slot.value.is_some())
            .then_some(handle.index as usize)
    }
}

impl<T: Persist + Default> Persist for HandleList<T> {
    fn persist(&mut self, mgr: &mut PersistMgr) -> Result<(), PersistError> {
        let count = mgr.transfer_count("count", self.len(), 1)?;
        if !mgr.is_saving() {
            self.drain();
            for _ in 0..count {
                self.push(T::default());
            }
        }
        for item in self.values_mut() {
            item.persist(mgr)?;
        }
        Ok(())
    }
}
