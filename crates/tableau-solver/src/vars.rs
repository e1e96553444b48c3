//! Variable registry: creation, recycling and per-variable bookkeeping.

use tableau_core::{Role, SolveError, Strength, VarId};

/// Per-variable state owned by the registry.
#[derive(Debug, Clone)]
struct Slot {
    role: Role,
    strength: Strength,
    name: Option<String>,
    /// Resolved value, written by the system after minimizing.
    value: f32,
    /// Index of the row this variable is basic in, if any.
    definition: Option<usize>,
    live: bool,
}

impl Slot {
    fn new(role: Role, strength: Strength) -> Self {
        Self {
            role,
            strength,
            name: None,
            value: 0.0,
            definition: None,
            live: true,
        }
    }
}

/// Creates and recycles solver variables.
///
/// Identities are assigned monotonically; released identities go to a free
/// pool and are reused on the next `create`. The registry clears a slot on
/// release so stale bookkeeping can never leak into a renumbered table.
#[derive(Debug, Default)]
pub struct VariableRegistry {
    slots: Vec<Slot>,
    free: Vec<usize>,
}

impl VariableRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate or recycle an identity for a variable of the given role.
    /// Strength is only meaningful for `Error` variables.
    pub fn create(&mut self, role: Role, strength: Strength) -> VarId {
        match self.free.pop() {
            Some(index) => {
                self.slots[index] = Slot::new(role, strength);
                VarId::new(index)
            }
            None => {
                self.slots.push(Slot::new(role, strength));
                VarId::new(self.slots.len() - 1)
            }
        }
    }

    /// Return an identity to the free pool. The handle must not be used
    /// afterward; any row still referencing it must already be gone.
    pub fn release(&mut self, variable: VarId) {
        let index = variable.index();
        if let Some(slot) = self.slots.get_mut(index) {
            if slot.live {
                slot.live = false;
                slot.name = None;
                slot.definition = None;
                slot.value = 0.0;
                self.free.push(index);
            }
        }
    }

    /// Number of slots ever allocated (live or pooled). Ids are always
    /// strictly below this.
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn is_live(&self, variable: VarId) -> bool {
        self.slots
            .get(variable.index())
            .map(|s| s.live)
            .unwrap_or(false)
    }

    fn slot(&self, variable: VarId) -> Result<&Slot, SolveError> {
        self.slots
            .get(variable.index())
            .filter(|s| s.live)
            .ok_or(SolveError::UnknownVariable(variable))
    }

    fn slot_mut(&mut self, variable: VarId) -> Result<&mut Slot, SolveError> {
        self.slots
            .get_mut(variable.index())
            .filter(|s| s.live)
            .ok_or(SolveError::UnknownVariable(variable))
    }

    pub fn role(&self, variable: VarId) -> Role {
        self.slots[variable.index()].role
    }

    pub fn strength(&self, variable: VarId) -> Strength {
        self.slots[variable.index()].strength
    }

    pub fn value(&self, variable: VarId) -> Result<f32, SolveError> {
        self.slot(variable).map(|s| s.value)
    }

    pub fn set_value(&mut self, variable: VarId, value: f32) {
        self.slots[variable.index()].value = value;
    }

    /// Reset every stored value to the non-basic resting value 0.
    pub fn clear_values(&mut self) {
        for slot in &mut self.slots {
            slot.value = 0.0;
        }
    }

    /// Index of the row currently defining the variable, if it is basic.
    pub fn definition(&self, variable: VarId) -> Option<usize> {
        self.slots.get(variable.index()).and_then(|s| s.definition)
    }

    pub fn set_definition(&mut self, variable: VarId, row: Option<usize>) {
        self.slots[variable.index()].definition = row;
    }

    /// Attach a debug name. Names are a debugging aid only and never used
    /// for identity.
    pub fn set_name(&mut self, variable: VarId, name: &str) -> Result<(), SolveError> {
        self.slot_mut(variable)?.name = Some(name.to_string());
        Ok(())
    }

    pub fn name(&self, variable: VarId) -> Option<&str> {
        self.slots
            .get(variable.index())
            .and_then(|s| s.name.as_deref())
    }

    /// Live variables, in id order.
    pub fn live_vars(&self) -> impl Iterator<Item = VarId> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.live)
            .map(|(i, _)| VarId::new(i))
    }

    /// Drop every variable, keeping allocated capacity for the next pass.
    pub fn reset(&mut self) {
        self.slots.clear();
        self.free.clear();
    }
}
