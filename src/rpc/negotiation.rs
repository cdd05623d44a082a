use serde_json::Value;

use super::methods::{
    SUPPORTED_APP_TO_TERMINAL, SUPPORTED_OPAPP_TO_TERMINAL, SUPPORTED_TERMINAL_TO_APP,
    SUPPORTED_TERMINAL_TO_OPAPP,
};
use super::registry::{ConnectionId, ConnectionRegistry, Direction};

/// Whether `method` may be negotiated in `direction` by this kind of peer.
pub fn is_supported(method: &str, direction: Direction, op_app: bool) -> bool {
    let (generic, privileged) = match direction {
        Direction::AppToTerminal => (SUPPORTED_APP_TO_TERMINAL, SUPPORTED_OPAPP_TO_TERMINAL),
        Direction::TerminalToApp => (SUPPORTED_TERMINAL_TO_APP, SUPPORTED_TERMINAL_TO_OPAPP),
    };
    generic.contains(&method) || (op_app && privileged.contains(&method))
}

/// Keep the proposed entries this terminal supports, record them in the
/// connection's negotiated set and return them in input order.
///
/// Unsupported or non-string entries are dropped. Earlier negotiations are
/// never undone.
pub fn filter_methods(
    registry: &ConnectionRegistry,
    connection_id: ConnectionId,
    proposed: &[Value],
    direction: Direction,
) -> Vec<Value> {
    let op_app = registry.is_op_app(connection_id);
    proposed
        .iter()
        .filter(|entry| {
            entry
                .as_str()
                .is_some_and(|m| is_supported(m, direction, op_app))
        })
        .inspect(|entry| {
            if let Some(method) = entry.as_str() {
                registry.add_negotiated(connection_id, direction, method);
            }
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::methods::*;
    use serde_json::json;

    fn proposed(v: Value) -> Vec<Value> {
        v.as_array().cloned().unwrap()
    }

    #[test]
    fn drops_unknown_and_keeps_order() {
        let reg = ConnectionRegistry::new();
        reg.create(1, false);
        let accepted = filter_methods(
            &reg,
            1,
            &proposed(json!([STATE_MEDIA, "org.example.bogus", 7, SUBSCRIBE])),
            Direction::AppToTerminal,
        );
        assert_eq!(accepted, vec![json!(STATE_MEDIA), json!(SUBSCRIBE)]);
        assert!(reg.is_negotiated(1, Direction::AppToTerminal, STATE_MEDIA));
        assert!(!reg.is_negotiated(1, Direction::AppToTerminal, "org.example.bogus"));
    }

    #[test]
    fn opapp_tables_need_opapp_peer() {
        let reg = ConnectionRegistry::new();
        reg.create(1, false);
        reg.create(2, true);
        let list = proposed(json!([IPPLAYER_PLAY, NOTIFY]));
        assert_eq!(
            filter_methods(&reg, 1, &list, Direction::TerminalToApp),
            vec![json!(NOTIFY)]
        );
        assert_eq!(
            filter_methods(&reg, 2, &list, Direction::TerminalToApp),
            vec![json!(IPPLAYER_PLAY), json!(NOTIFY)]
        );
    }

    #[test]
    fn directions_are_not_mixed() {
        assert!(!is_supported(NOTIFY, Direction::AppToTerminal, true));
        assert!(!is_supported(SUBSCRIBE, Direction::TerminalToApp, true));
        assert!(is_supported(IPPLAYBACK_STATUS_UPDATE, Direction::AppToTerminal, true));
        assert!(!is_supported(IPPLAYBACK_STATUS_UPDATE, Direction::TerminalToApp, true));
    }

    #[test]
    fn negotiation_is_additive() {
        let reg = ConnectionRegistry::new();
        reg.create(1, false);
        filter_methods(&reg, 1, &proposed(json!([SUBSCRIBE])), Direction::AppToTerminal);
        let before = reg.negotiated(1, Direction::AppToTerminal);
        filter_methods(&reg, 1, &proposed(json!([VOICE_READY])), Direction::AppToTerminal);
        let after = reg.negotiated(1, Direction::AppToTerminal);
        assert!(before.is_subset(&after));
        assert!(after.contains(VOICE_READY));
    }
}
