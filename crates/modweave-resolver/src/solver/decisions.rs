use super::pool::VarId;
use super::rule::Literal;

/// Assignment state of the solver.
///
/// The decision map stores, per variable, the level it was decided at:
/// positive when the candidate loads, negative when it does not, zero while
/// undecided.
#[derive(Debug, Clone)]
pub struct Decisions {
    decision_map: Vec<i32>,
    queue: Vec<(Literal, Option<u32>)>,
    level: u32,
}

impl Decisions {
    pub fn new(var_count: usize) -> Self {
        Self {
            decision_map: vec![0; var_count + 1],
            queue: Vec::new(),
            level: 0,
        }
    }

    /// Record `literal` as true at the current level
    pub fn decide(&mut self, literal: Literal, reason: Option<u32>) {
        let var = literal.unsigned_abs() as usize;
        let level = self.level as i32;
        self.decision_map[var] = if literal > 0 { level } else { -level };
        self.queue.push((literal, reason));
    }

    pub fn satisfied(&self, literal: Literal) -> bool {
        let value = self.decision_map[literal.unsigned_abs() as usize];
        (literal > 0 && value > 0) || (literal < 0 && value < 0)
    }

    pub fn conflict(&self, literal: Literal) -> bool {
        let value = self.decision_map[literal.unsigned_abs() as usize];
        (literal > 0 && value < 0) || (literal < 0 && value > 0)
    }

    pub fn decided(&self, var: VarId) -> bool {
        self.decision_map[var.unsigned_abs() as usize] != 0
    }

    pub fn undecided(&self, var: VarId) -> bool {
        !self.decided(var)
    }

    pub fn decided_install(&self, var: VarId) -> bool {
        self.decision_map[var.unsigned_abs() as usize] > 0
    }

    pub fn decision_level(&self, var: VarId) -> Option<u32> {
        match self.decision_map[var.unsigned_abs() as usize] {
            0 => None,
            value => Some(value.unsigned_abs()),
        }
    }

    /// Rule that forced `var`, if it was propagated rather than chosen
    pub fn decision_rule(&self, var: VarId) -> Option<u32> {
        self.queue
            .iter()
            .find(|(literal, _)| literal.abs() == var.abs())
            .and_then(|(_, reason)| *reason)
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn increment_level(&mut self) {
        self.level += 1;
    }

    /// Undo every decision made above `level`
    pub fn revert_to_level(&mut self, level: u32) {
        while let Some(&(literal, _)) = self.queue.last() {
            let var = literal.unsigned_abs() as usize;
            if self.decision_map[var].unsigned_abs() <= level {
                break;
            }
            self.decision_map[var] = 0;
            self.queue.pop();
        }
        self.level = level;
    }

    pub fn queue(&self) -> &[(Literal, Option<u32>)] {
        &self.queue
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Loaded variables, ascending
    pub fn installed(&self) -> Vec<VarId> {
        (1..self.decision_map.len())
            .filter(|&var| self.decision_map[var] > 0)
            .map(|var| var as VarId)
            .collect()
    }
}
