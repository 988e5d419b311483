//! Turning counter table contents into [`StatRecord`]s.
use std::sync::Arc;

use crate::interfaces::Bindings;
use crate::probe::{self, Hook, Probes};

/// One decoded counter observation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatRecord {
    /// Monotonic kernel timestamp of the packet.
    pub timestamp: u64,
    pub packet_hash: u32,
    pub if_index: u32,
    pub length: u32,
    pub container_name: Arc<str>,
    pub container_id: Arc<str>,
    pub veth_name: Arc<str>,
    /// Label of the hook whose table produced the record.
    pub hook: &'static str,
}

/// Reads every counter table in [`Hook::ALL`] order and resolves each entry against `bindings`.
///
/// A table that cannot be read contributes no records. Entries for unknown interfaces are kept
/// with empty identity columns.
pub fn snapshot<P>(probes: &P, bindings: &Bindings) -> Vec<StatRecord>
where
    P: Probes + ?Sized,
{
    let mut records = Vec::new();
    for hook in Hook::ALL {
        match read_table(probes, hook, bindings) {
            Ok(mut table) => {
                log::debug!("{hook}: {} entries", table.len());
                records.append(&mut table);
            }
            Err(err) => log::warn!("{hook}: skipping unreadable counter table: {err}"),
        }
    }
    records
}

fn read_table<P>(probes: &P, hook: Hook, bindings: &Bindings) -> probe::Result<Vec<StatRecord>>
where
    P: Probes + ?Sized,
{
    let native_length = hook.stores_native_length();
    probes
        .table(hook)?
        .entries()
        .map(|entry| -> probe::Result<StatRecord> {
            let (_, info) = entry?;
            let decoded = info.decode(native_length);
            let resolved = bindings.resolve(decoded.if_index);
            Ok(StatRecord {
                timestamp: decoded.timestamp,
                packet_hash: decoded.hash,
                if_index: decoded.if_index,
                length: decoded.length,
                container_name: resolved.container_name,
                container_id: resolved.container_id,
                veth_name: resolved.veth_name,
                hook: hook.label(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::PacketInfo;
    use crate::testing::FakeProbes;

    fn host_bindings() -> Bindings {
        let mut builder = Bindings::builder();
        builder.seed_synthetic(6, |idx| (idx == 1).then(|| "lo".to_owned()));
        builder.build()
    }

    #[test]
    fn test_decodes_wire_order_lengths() {
        let probes = FakeProbes::new().with_entry(
            Hook::TC_INGRESS,
            9,
            PacketInfo::new(10, 0xabc, 4, 1500),
        );

        let records = snapshot(&probes, &host_bindings());
        assert_eq!(
            records,
            vec![StatRecord {
                timestamp: 10,
                packet_hash: 0xabc,
                if_index: 4,
                length: 1500,
                container_name: "".into(),
                container_id: "".into(),
                veth_name: "".into(),
                hook: "tc_ingress",
            }]
        );
    }

    #[test]
    fn test_swaps_length_on_xdp_tables() {
        let probes = FakeProbes::new()
            .with_entry(Hook::XDP_INGRESS, 1, PacketInfo::new(1, 1, 1, 0x1234))
            .with_entry(Hook::XDP_EGRESS, 1, PacketInfo::new(1, 1, 1, 0x1234))
            .with_entry(Hook::SKB_INGRESS, 1, PacketInfo::new(1, 1, 1, 0x1234));

        let records = snapshot(&probes, &host_bindings());
        let lengths: Vec<_> = records.iter().map(|r| (r.hook, r.length)).collect();
        assert_eq!(
            lengths,
            vec![
                ("skb_ingress", 0x1234),
                ("xdp_ingress", 0x3412),
                ("xdp_egress", 0x3412)
            ]
        );
        assert_eq!(&*records[0].container_name, "host_lo");
        assert_eq!(&*records[0].container_id, "host");
        assert_eq!(&*records[0].veth_name, "lo");
    }

    #[test]
    fn test_unreadable_table_yields_nothing_for_that_hook() {
        let probes = FakeProbes::new()
            .with_entry(Hook::TC_EGRESS, 1, PacketInfo::new(1, 1, 6, 60))
            .break_table(Hook::TC_INGRESS)
            .with_entry(Hook::TC_INGRESS, 1, PacketInfo::new(1, 1, 6, 60));

        let records = snapshot(&probes, &host_bindings());
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].hook, "tc_egress");
        assert_eq!(&*records[0].container_name, "docker0");
        assert_eq!(&*records[0].veth_name, "iface=6");
    }

    #[test]
    fn test_tables_are_read_in_fixed_order() {
        let mut probes = FakeProbes::new();
        for hook in Hook::ALL.into_iter().rev() {
            probes = probes.with_entry(hook, 0, PacketInfo::default());
        }
        let hooks: Vec<_> = snapshot(&probes, &Bindings::default())
            .into_iter()
            .map(|r| r.hook)
            .collect();
        assert_eq!(
            hooks,
            vec![
                "skb_egress",
                "skb_ingress",
                "tc_egress",
                "tc_ingress",
                "xdp_ingress",
                "xdp_egress"
            ]
        );
    }
}
