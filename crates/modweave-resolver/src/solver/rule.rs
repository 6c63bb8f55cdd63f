use std::fmt;

use super::pool::VarId;
use crate::candidate::CandidateId;

/// A literal in SAT terms - positive means "load", negative means "don't load"
pub type Literal = i32;

/// Types of rules generated during mod resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleType {
    /// A root candidate must load unless a conflicting candidate displaces it
    RootRequire,
    /// Candidate dependency: if A loads, then B|C|D must load
    Depends,
    /// A breaks B: they cannot both load
    Breaks,
    /// A conflicts with B: they cannot both load
    Conflicts,
    /// A committed exclusive owner of an id excludes the other exclusive
    /// claimants of that id
    SameId,
    /// At most `limit` of these candidates may load
    MultiConflict,
    /// A nested candidate only loads alongside one of its parents
    Nesting,
    /// Links a relaxation variable to the candidates it stands in for
    Relaxation,
}

impl RuleType {
    /// Order used to pick the most specific rule out of a set of conflicting
    /// rules (lower = more specific)
    pub fn specificity(&self) -> u8 {
        match self {
            RuleType::MultiConflict => 0,
            RuleType::SameId => 1,
            RuleType::Depends => 2,
            RuleType::Breaks => 3,
            RuleType::Conflicts => 4,
            RuleType::Nesting => 5,
            RuleType::RootRequire => 6,
            RuleType::Relaxation => 7,
        }
    }

    pub fn is_multi_conflict(&self) -> bool {
        matches!(self, RuleType::MultiConflict)
    }
}

/// A SAT rule.
///
/// Most rules are clauses: disjunctions of literals, satisfied when at least
/// one literal is true. Multi-conflict rules instead hold negated literals of
/// which at most `limit` may be violated.
///
/// # Examples
///
/// - `[A]` - A must load (assertion)
/// - `[-A]` - A must not load
/// - `[-A, B, C]` - if A loads, then B or C must load
/// - `[-A, -B]` - A and B cannot both load
#[derive(Clone)]
pub struct Rule {
    literals: Vec<Literal>,
    rule_type: RuleType,
    /// Rule ID (assigned by RuleSet)
    id: u32,
    /// Candidate that declared the relation (for error messages)
    source: Option<CandidateId>,
    /// Target mod id (for error messages)
    target_name: Option<String>,
    /// Constraint string (for error messages)
    constraint: Option<String>,
    /// Index of the declaring dependency in the source's dependency list
    dependency: Option<usize>,
    limit: usize,
}

impl Rule {
    pub fn new(literals: Vec<Literal>, rule_type: RuleType) -> Self {
        Self {
            literals,
            rule_type,
            id: 0,
            source: None,
            target_name: None,
            constraint: None,
            dependency: None,
            limit: 1,
        }
    }

    /// Create an assertion rule (single literal that must be true)
    pub fn assertion(literal: Literal, rule_type: RuleType) -> Self {
        Self::new(vec![literal], rule_type)
    }

    /// `candidate` must load, unless one of `displacers` does
    pub fn root_require(candidate: VarId, displacers: Vec<VarId>) -> Self {
        let mut literals = vec![candidate];
        literals.extend(displacers);
        Self::new(literals, RuleType::RootRequire)
    }

    /// If `source` loads, one of `targets` must load. A constant source
    /// (already committed) is passed as `None`.
    pub fn depends(source: Option<VarId>, targets: Vec<VarId>) -> Self {
        let mut literals: Vec<Literal> = source.map(|s| vec![-s]).unwrap_or_default();
        literals.extend(targets);
        Self::new(literals, RuleType::Depends)
    }

    /// `child` only loads if one of `parents` does
    pub fn nesting(child: VarId, parents: Vec<VarId>) -> Self {
        let mut literals = vec![-child];
        literals.extend(parents);
        Self::new(literals, RuleType::Nesting)
    }

    /// These candidates cannot all load
    pub fn conflict(vars: Vec<VarId>, rule_type: RuleType) -> Self {
        let literals: Vec<_> = vars.into_iter().map(|v| -v).collect();
        Self::new(literals, rule_type)
    }

    /// At most one of these candidates can load
    pub fn multi_conflict(vars: Vec<VarId>) -> Self {
        Self::at_most(vars, 1)
    }

    /// At most `limit` of these candidates can load
    pub fn at_most(vars: Vec<VarId>, limit: usize) -> Self {
        let mut rule = Self::conflict(vars, RuleType::MultiConflict);
        rule.limit = limit;
        rule
    }

    pub fn set_id(&mut self, id: u32) {
        self.id = id;
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn with_source(mut self, candidate: CandidateId) -> Self {
        self.source = Some(candidate);
        self
    }

    pub fn with_target(mut self, name: impl Into<String>) -> Self {
        self.target_name = Some(name.into());
        self
    }

    pub fn with_constraint(mut self, constraint: impl Into<String>) -> Self {
        self.constraint = Some(constraint.into());
        self
    }

    pub fn with_dependency(mut self, index: usize) -> Self {
        self.dependency = Some(index);
        self
    }

    pub fn rule_type(&self) -> RuleType {
        self.rule_type
    }

    pub fn literals(&self) -> &[Literal] {
        &self.literals
    }

    pub fn push_literal(&mut self, literal: Literal) {
        self.literals.push(literal);
    }

    pub fn source(&self) -> Option<CandidateId> {
        self.source
    }

    pub fn target_name(&self) -> Option<&str> {
        self.target_name.as_deref()
    }

    pub fn constraint(&self) -> Option<&str> {
        self.constraint.as_deref()
    }

    pub fn dependency(&self) -> Option<usize> {
        self.dependency
    }

    /// How many of a multi-conflict rule's candidates may load
    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn is_multi_conflict(&self) -> bool {
        self.rule_type.is_multi_conflict()
    }

    pub fn is_assertion(&self) -> bool {
        self.literals.len() == 1 && !self.is_multi_conflict()
    }

    pub fn len(&self) -> usize {
        self.literals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.literals.is_empty()
    }

    /// Positive literals: the candidates that would satisfy the rule by
    /// loading
    pub fn positive_literals(&self) -> impl Iterator<Item = Literal> + '_ {
        self.literals.iter().copied().filter(|&l| l > 0)
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rule({:?}, {:?})", self.rule_type, self.literals)
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let literals: Vec<String> = self
            .literals
            .iter()
            .map(|&l| if l > 0 { format!("+{}", l) } else { format!("{}", l) })
            .collect();

        if self.is_multi_conflict() && self.limit != 1 {
            write!(f, "({} <= {}) [{}]", self.rule_type_str(), self.limit, literals.join(" | "))
        } else {
            write!(f, "({}) [{}]", self.rule_type_str(), literals.join(" | "))
        }
    }
}

impl Rule {
    fn rule_type_str(&self) -> &'static str {
        match self.rule_type {
            RuleType::RootRequire => "root-require",
            RuleType::Depends => "depends",
            RuleType::Breaks => "breaks",
            RuleType::Conflicts => "conflicts",
            RuleType::SameId => "same-id",
            RuleType::MultiConflict => "multi-conflict",
            RuleType::Nesting => "nesting",
            RuleType::Relaxation => "relaxation",
        }
    }
}
