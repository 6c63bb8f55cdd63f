use super::rule::{Rule, RuleType};

/// Rules of one solver run, addressed by id
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a rule and return its id
    pub fn add(&mut self, mut rule: Rule) -> u32 {
        let id = self.rules.len() as u32;
        rule.set_id(id);
        self.rules.push(rule);
        id
    }

    pub fn get(&self, id: u32) -> Option<&Rule> {
        self.rules.get(id as usize)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }

    pub fn as_slice(&self) -> &[Rule] {
        &self.rules
    }

    pub fn of_type(&self, rule_type: RuleType) -> impl Iterator<Item = &Rule> {
        self.rules.iter().filter(move |r| r.rule_type() == rule_type)
    }

    /// A new rule set holding only the rules `keep` accepts; rule ids are
    /// reassigned
    pub fn filtered<F>(&self, mut keep: F) -> RuleSet
    where
        F: FnMut(&Rule) -> bool,
    {
        let mut set = RuleSet::new();
        for rule in &self.rules {
            if keep(rule) {
                set.add(rule.clone());
            }
        }
        set
    }

    /// Highest variable referenced by any rule
    pub fn max_var(&self) -> usize {
        self.rules
            .iter()
            .flat_map(|r| r.literals().iter())
            .map(|l| l.unsigned_abs() as usize)
            .max()
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_sequential() {
        let mut set = RuleSet::new();
        let a = set.add(Rule::root_require(1, vec![]));
        let b = set.add(Rule::depends(Some(1), vec![2]));
        assert_eq!((a, b), (0, 1));
        assert_eq!(set.get(b).map(|r| r.rule_type()), Some(RuleType::Depends));
        assert!(set.get(9).is_none());
        assert_eq!(set.max_var(), 2);
    }

    #[test]
    fn test_filtered_reassigns_ids() {
        let mut set = RuleSet::new();
        set.add(Rule::root_require(1, vec![]));
        set.add(Rule::depends(Some(1), vec![2]));
        set.add(Rule::conflict(vec![1, 3], RuleType::Breaks));

        let subset = set.filtered(|r| r.rule_type() != RuleType::Depends);
        assert_eq!(subset.len(), 2);
        assert_eq!(subset.get(1).map(|r| r.rule_type()), Some(RuleType::Breaks));
        assert_eq!(subset.get(1).map(|r| r.id()), Some(1));
        assert_eq!(subset.of_type(RuleType::RootRequire).count(), 1);
    }
}
