//! `$ADDRESS` expansion.
//!
//! An address group maps a name to a whitespace separated list of tokens.
//! Each token is either an IP literal or the name of another group, so
//! groups form a graph that is walked depth first, left to right.

use std::collections::HashMap;
use std::net::IpAddr;

use tracing::trace;

use crate::error::{Result, TempleError};
use crate::template::split_fields;
use crate::variables::{expand_variables, Variables};

/// Maximum nesting of address groups.
///
/// Revisiting a group already on the expansion path is rejected
/// independently of this bound.
pub const MAX_ADDRESS_DEPTH: usize = 16;

const ADDRESS_FORMAT: &str = "$ADDRESS <address> <prefix>";

/// Expands address groups into `A`/`AAAA` record lines.
#[derive(Debug, Clone, Copy)]
pub struct AddressResolver<'a> {
    addresses: &'a HashMap<String, String>,
    variables: &'a Variables,
    file: &'a str,
}

impl<'a> AddressResolver<'a> {
    /// Create a resolver over the given groups.
    ///
    /// Group definitions are variable-substituted with `variables` before
    /// they are tokenised; `file` is used for error messages.
    pub fn new(
        addresses: &'a HashMap<String, String>,
        variables: &'a Variables,
        file: &'a str,
    ) -> Self {
        Self {
            addresses,
            variables,
            file,
        }
    }

    /// Expand `group` into record lines owned by `prefix`.
    pub fn expand(&self, group: &str, prefix: &str) -> Result<Vec<String>> {
        let mut output = Vec::new();
        let mut chain = Vec::new();
        self.expand_into(group, prefix, &mut chain, &mut output)?;
        Ok(output)
    }

    fn expand_into(
        &self,
        group: &str,
        prefix: &str,
        chain: &mut Vec<String>,
        output: &mut Vec<String>,
    ) -> Result<()> {
        if chain.len() >= MAX_ADDRESS_DEPTH || chain.iter().any(|g| g == group) {
            let mut chain = chain.clone();
            chain.push(group.to_string());
            return Err(TempleError::AddressTooDeep { chain });
        }
        let definition = self
            .addresses
            .get(group)
            .ok_or_else(|| TempleError::UnknownAddress {
                name: group.to_string(),
                chain: chain.clone(),
            })?;
        let definition = expand_variables(self.file, definition, self.variables)?;

        trace!(group, depth = chain.len(), "expanding address group");
        chain.push(group.to_string());
        for token in definition.split_whitespace() {
            match token.parse::<IpAddr>() {
                Ok(ip) => output.push(record_line(prefix, ip, token)),
                Err(_) => self.expand_into(token, prefix, chain, output)?,
            }
        }
        chain.pop();
        Ok(())
    }
}

/// Format one record, padding short owners so the type column lines up at
/// a tab width of 8.
fn record_line(prefix: &str, ip: IpAddr, literal: &str) -> String {
    let align = if prefix.chars().count() < 8 { "\t" } else { "" };
    let rtype = match ip {
        IpAddr::V4(_) => "A",
        IpAddr::V6(_) => "AAAA",
    };
    format!("{prefix}{align}\t{rtype}\t{literal}")
}

/// Expand an `$ADDRESS <group> <prefix>` directive line.
///
/// The prefix is the remainder of the line and may contain whitespace.
pub fn expand_address(
    file: &str,
    line: &str,
    addresses: &HashMap<String, String>,
    variables: &Variables,
) -> Result<Vec<String>> {
    let fields = split_fields(line, 2);
    let &[_, group, prefix] = fields.as_slice() else {
        return Err(TempleError::Format {
            expected: ADDRESS_FORMAT,
            file: file.to_string(),
            line: line.to_string(),
        });
    };
    AddressResolver::new(addresses, variables, file).expand(group, prefix)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn expand(addresses: &[(&str, &str)], variables: &[(&str, &str)]) -> Result<Vec<String>> {
        expand_address(
            "a.zone",
            "$ADDRESS\tx\t@",
            &map(addresses),
            &map(variables),
        )
    }

    #[test]
    fn test_expand_ipv4() {
        assert_eq!(
            expand(&[("x", "1.2.3.4")], &[]).unwrap(),
            vec!["@\t\tA\t1.2.3.4"]
        );
    }

    #[test]
    fn test_expand_ipv4_ipv6() {
        assert_eq!(
            expand(&[("x", "1.2.3.4 ::1")], &[]).unwrap(),
            vec!["@\t\tA\t1.2.3.4", "@\t\tAAAA\t::1"]
        );
    }

    #[test]
    fn test_expand_variable() {
        assert_eq!(
            expand(&[("x", "{y}")], &[("y", "1.2.3.4 ::1")]).unwrap(),
            vec!["@\t\tA\t1.2.3.4", "@\t\tAAAA\t::1"]
        );
    }

    #[test]
    fn test_expand_variable_plus() {
        assert_eq!(
            expand(&[("x", "{y} 127.0.0.1 {y}")], &[("y", "1.2.3.4 ::1")]).unwrap(),
            vec![
                "@\t\tA\t1.2.3.4",
                "@\t\tAAAA\t::1",
                "@\t\tA\t127.0.0.1",
                "@\t\tA\t1.2.3.4",
                "@\t\tAAAA\t::1",
            ]
        );
    }

    #[test]
    fn test_expand_recursive() {
        assert_eq!(
            expand(
                &[("x", "y z"), ("y", "1.2.3.4"), ("z", "127.0.0.1 ::1")],
                &[]
            )
            .unwrap(),
            vec!["@\t\tA\t1.2.3.4", "@\t\tA\t127.0.0.1", "@\t\tAAAA\t::1"]
        );
    }

    #[test]
    fn test_shared_group_is_not_a_cycle() {
        // Diamond: both y and z reference w.
        assert_eq!(
            expand(&[("x", "y z"), ("y", "w"), ("z", "w"), ("w", "10.0.0.1")], &[]).unwrap(),
            vec!["@\t\tA\t10.0.0.1", "@\t\tA\t10.0.0.1"]
        );
    }

    #[test]
    fn test_expand_too_deep() {
        let err = expand(
            &[("x", "x y z"), ("y", "1.2.3.4"), ("z", "127.0.0.1 ::1")],
            &[],
        )
        .unwrap_err();
        assert!(matches!(err, TempleError::AddressTooDeep { .. }));
        assert!(err.to_string().contains("Address expansion too deep"));
    }

    #[test]
    fn test_indirect_cycle_too_deep() {
        let err = expand(&[("x", "y"), ("y", "z"), ("z", "x")], &[]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Address expansion too deep expanding \"x\" (expanded from address \"z\" \
             (expanded from address \"y\" (expanded from address \"x\")))"
        );
    }

    #[test]
    fn test_depth_bound() {
        // g0 -> g1 -> ... -> gN, each distinct, longer than the bound.
        let names: Vec<String> = (0..=MAX_ADDRESS_DEPTH).map(|i| format!("g{i}")).collect();
        let mut groups: Vec<(String, String)> = names
            .windows(2)
            .map(|w| (w[0].clone(), w[1].clone()))
            .collect();
        groups.push((names[MAX_ADDRESS_DEPTH].clone(), "192.0.2.1".to_string()));
        let addresses: HashMap<String, String> = groups.into_iter().collect();
        let variables = Variables::new();

        let err = AddressResolver::new(&addresses, &variables, "a.zone")
            .expand("g0", "@")
            .unwrap_err();
        assert!(matches!(err, TempleError::AddressTooDeep { .. }));
    }

    #[test]
    fn test_expand_invalid() {
        let err = expand(&[("x", "y"), ("y", "z"), ("z", "fails")], &[]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Address \"fails\" unknown expanding \"z\" (expanded from address \"y\" \
             (expanded from address \"x\"))"
        );
    }

    #[test]
    fn test_long_prefix_single_tab() {
        let addresses = map(&[("x", "1.2.3.4")]);
        let variables = Variables::new();
        let lines = AddressResolver::new(&addresses, &variables, "a.zone")
            .expand("x", "longername")
            .unwrap();
        assert_eq!(lines, vec!["longername\tA\t1.2.3.4"]);
    }

    #[test]
    fn test_unknown_top_level_group() {
        let err = expand(&[("y", "1.2.3.4")], &[]).unwrap_err();
        assert_eq!(err.to_string(), "Address \"x\" unknown");
    }

    #[test]
    fn test_missing_prefix_is_format_error() {
        let err = expand_address("a.zone", "$ADDRESS x", &map(&[("x", "1.2.3.4")]), &map(&[]))
            .unwrap_err();
        assert!(err.to_string().contains("$ADDRESS <address> <prefix>"));
    }
}
