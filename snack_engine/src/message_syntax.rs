//! Inline directives in dialogue text: `\p[key]`, `\v[id]`,
//! `\i[id:name]` and `\t[table:record:attr]`.
//!
//! Item ids and table records may also be written as `v[id]` to read them
//! from a variable. Directives that do not parse are left as written.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static MESSAGE_COMMAND: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\\([a-zA-Z])\[([^\\]+)\]").expect("valid message command regex"));
static MESSAGE_ITEM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([^:]+):name$").expect("valid message item regex"));
static MESSAGE_TABLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([^:]+):([^:]+):([^:]+)$").expect("valid message table regex")
});
static MESSAGE_VARIABLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^v\[([0-9]+)\]$").expect("valid message variable regex"));

/// Lookups a directive can resolve against.
pub trait MessageContext {
    fn price(&self, product_key: &str) -> String;
    fn variable(&self, id: i32) -> i64;
    fn item_name(&self, item_id: i32) -> Option<String>;
    fn table_value(&self, table: &str, record_id: i64, attr: &str) -> Option<String>;
}

pub fn parse_message_syntax<C: MessageContext + ?Sized>(content: &str, context: &C) -> String {
    MESSAGE_COMMAND
        .replace_all(content, |caps: &Captures<'_>| {
            let kind = caps[1].to_ascii_lowercase();
            let args = &caps[2];
            resolve(&kind, args, context).unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

fn resolve<C: MessageContext + ?Sized>(kind: &str, args: &str, context: &C) -> Option<String> {
    match kind {
        "p" => Some(context.price(args)),
        "v" => {
            let id = args.parse::<i32>().ok()?;
            Some(context.variable(id).to_string())
        }
        "i" => {
            let caps = MESSAGE_ITEM.captures(args)?;
            let item_id = id_or_variable(&caps[1], context)?;
            let item_id = i32::try_from(item_id).ok()?;
            context.item_name(item_id)
        }
        "t" => {
            let caps = MESSAGE_TABLE.captures(args)?;
            let record_id = id_or_variable(&caps[2], context)?;
            context.table_value(&caps[1], record_id, &caps[3])
        }
        _ => None,
    }
}

fn id_or_variable<C: MessageContext + ?Sized>(raw: &str, context: &C) -> Option<i64> {
    if let Some(caps) = MESSAGE_VARIABLE.captures(raw) {
        let variable_id = caps[1].parse::<i32>().ok()?;
        return Some(context.variable(variable_id));
    }
    raw.parse::<i64>().ok()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    #[derive(Default)]
    struct Fixture {
        prices: BTreeMap<String, String>,
        variables: BTreeMap<i32, i64>,
        items: BTreeMap<i32, String>,
    }

    impl MessageContext for Fixture {
        fn price(&self, product_key: &str) -> String {
            self.prices.get(product_key).cloned().unwrap_or_default()
        }

        fn variable(&self, id: i32) -> i64 {
            self.variables.get(&id).copied().unwrap_or(0)
        }

        fn item_name(&self, item_id: i32) -> Option<String> {
            self.items.get(&item_id).cloned()
        }

        fn table_value(&self, table: &str, record_id: i64, attr: &str) -> Option<String> {
            (table == "monsters" && attr == "hp").then(|| format!("{}", record_id * 10))
        }
    }

    fn fixture() -> Fixture {
        let mut fixture = Fixture::default();
        fixture
            .prices
            .insert("unlock_all".to_string(), "$1.99".to_string());
        fixture.variables.insert(3, 42);
        fixture.variables.insert(4, 7);
        fixture.items.insert(7, "Key".to_string());
        fixture
    }

    #[test]
    fn substitutes_each_directive_kind() {
        let fixture = fixture();
        assert_eq!(
            parse_message_syntax(r"Score: \v[3]", &fixture),
            "Score: 42"
        );
        assert_eq!(
            parse_message_syntax(r"Only \p[unlock_all]!", &fixture),
            "Only $1.99!"
        );
        assert_eq!(
            parse_message_syntax(r"Got \i[7:name] and \i[v[4]:name]", &fixture),
            "Got Key and Key"
        );
        assert_eq!(
            parse_message_syntax(r"HP \t[monsters:v[4]:hp] / \t[monsters:2:hp]", &fixture),
            "HP 70 / 20"
        );
        assert_eq!(parse_message_syntax(r"\V[3]", &fixture), "42");
    }

    #[test]
    fn unparsable_directives_stay_verbatim() {
        let fixture = fixture();
        let raw = r"\v[abc] \i[7] \x[1] \t[monsters:1] plain";
        assert_eq!(parse_message_syntax(raw, &fixture), raw);
        assert_eq!(parse_message_syntax(r"\i[99:name]", &fixture), r"\i[99:name]");
    }
}
