use serde::{Deserialize, Serialize};

/// A predicate over game state used by `if`, page selection and choice
/// visibility.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Condition {
    Switch {
        id: i32,
        value: bool,
    },
    SelfSwitch {
        id: i32,
        value: bool,
    },
    Variable {
        id: i32,
        comp: Comparison,
        value: i64,
        #[serde(rename = "valueType", default)]
        value_type: ConditionValueType,
    },
    Item {
        #[serde(default)]
        id: i32,
        value: ItemCondition,
    },
    Special {
        value: SpecialCondition,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparison {
    #[serde(rename = "==")]
    Equal,
    #[serde(rename = "!=")]
    NotEqual,
    #[serde(rename = ">=")]
    GreaterOrEqual,
    #[serde(rename = ">")]
    Greater,
    #[serde(rename = "<=")]
    LessOrEqual,
    #[serde(rename = "<")]
    Less,
}

impl Comparison {
    pub fn compare(self, lhs: i64, rhs: i64) -> bool {
        match self {
            Comparison::Equal => lhs == rhs,
            Comparison::NotEqual => lhs != rhs,
            Comparison::GreaterOrEqual => lhs >= rhs,
            Comparison::Greater => lhs > rhs,
            Comparison::LessOrEqual => lhs <= rhs,
            Comparison::Less => lhs < rhs,
        }
    }
}

/// How the right-hand side of a variable comparison is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionValueType {
    #[default]
    Constant,
    /// `value` is a variable id.
    Variable,
    /// `value` is a variable id whose value is another variable id.
    VariableRef,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemCondition {
    Own,
    NotOwn,
    Active,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpecialCondition {
    EventExistsAtPlayer,
}

/// Per-choice visibility and "already picked" markers for `show_choices`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceCondition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible: Option<Condition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checked: Option<Condition>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_tagged_conditions() {
        let json = r#"[
            {"type": "switch", "id": 3, "value": true},
            {"type": "variable", "id": 1, "comp": ">=", "value": 2, "valueType": "variable"},
            {"type": "item", "value": "own"},
            {"type": "special", "value": "event_exists_at_player"}
        ]"#;
        let conditions: Vec<Condition> = serde_json::from_str(json).expect("conditions");
        assert_eq!(
            conditions[1],
            Condition::Variable {
                id: 1,
                comp: Comparison::GreaterOrEqual,
                value: 2,
                value_type: ConditionValueType::Variable,
            }
        );
        assert_eq!(
            conditions[2],
            Condition::Item {
                id: 0,
                value: ItemCondition::Own
            }
        );
    }

    #[test]
    fn comparisons_follow_operator_table() {
        assert!(Comparison::Equal.compare(3, 3));
        assert!(Comparison::NotEqual.compare(3, 4));
        assert!(Comparison::Greater.compare(4, 3));
        assert!(!Comparison::Less.compare(4, 3));
        assert!(Comparison::LessOrEqual.compare(3, 3));
    }
}
