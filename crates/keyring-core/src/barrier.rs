//! Counting barrier over a fixed set of slots.

/// Collects one value per slot and reports completion once every slot has
/// arrived, regardless of arrival order.
#[derive(Debug, Clone)]
pub struct StageBarrier<T> {
    slots: Vec<Option<T>>,
    arrived: usize,
}

impl<T> StageBarrier<T> {
    pub fn new(expected: usize) -> Self {
        Self {
            slots: std::iter::repeat_with(|| None).take(expected).collect(),
            arrived: 0,
        }
    }

    pub fn expected(&self) -> usize {
        self.slots.len()
    }

    pub fn arrived(&self) -> usize {
        self.arrived
    }

    /// Stores `value` in `slot`. Returns false for an out-of-range or
    /// already filled slot, leaving the barrier unchanged.
    pub fn arrive(&mut self, slot: usize, value: T) -> bool {
        match self.slots.get_mut(slot) {
            Some(entry @ None) => {
                *entry = Some(value);
                self.arrived += 1;
                true
            }
            _ => false,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.arrived == self.slots.len()
    }

    /// Slots that have not arrived yet, in slot order.
    pub fn missing(&self) -> impl Iterator<Item = usize> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.is_none().then_some(i))
    }

    /// Consumes the barrier, filling any missing slot with `fill(slot)`.
    pub fn into_values(self, mut fill: impl FnMut(usize) -> T) -> Vec<T> {
        self.slots
            .into_iter()
            .enumerate()
            .map(|(i, slot)| slot.unwrap_or_else(|| fill(i)))
            .collect()
    }
}
