use std::fmt;

/// Kernel layer a probe is attached at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Layer {
    /// Socket buffer layer, attached once to the cgroup v2 root.
    Skb,
    /// Traffic control layer (TCX), attached per interface.
    Tc,
    /// Packet filter layer (XDP), attached per interface, ingress only.
    Xdp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Direction {
    Ingress,
    Egress,
}

/// A layer and direction pair. Every hook owns one counter table; all but
/// [`Hook::XDP_EGRESS`] also own a probe program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Hook {
    pub layer: Layer,
    pub direction: Direction,
}

impl Hook {
    pub const SKB_INGRESS: Hook = Hook::new(Layer::Skb, Direction::Ingress);
    pub const SKB_EGRESS: Hook = Hook::new(Layer::Skb, Direction::Egress);
    pub const TC_INGRESS: Hook = Hook::new(Layer::Tc, Direction::Ingress);
    pub const TC_EGRESS: Hook = Hook::new(Layer::Tc, Direction::Egress);
    pub const XDP_INGRESS: Hook = Hook::new(Layer::Xdp, Direction::Ingress);
    pub const XDP_EGRESS: Hook = Hook::new(Layer::Xdp, Direction::Egress);

    /// Every hook with a counter table, in the order snapshots read them.
    pub const ALL: [Hook; 6] = [
        Hook::SKB_EGRESS,
        Hook::SKB_INGRESS,
        Hook::TC_EGRESS,
        Hook::TC_INGRESS,
        Hook::XDP_INGRESS,
        Hook::XDP_EGRESS,
    ];

    /// Hooks that have a probe program, in the order they are attached at startup.
    pub const ATTACHABLE: [Hook; 5] = [
        Hook::SKB_INGRESS,
        Hook::SKB_EGRESS,
        Hook::TC_INGRESS,
        Hook::TC_EGRESS,
        Hook::XDP_INGRESS,
    ];

    pub const fn new(layer: Layer, direction: Direction) -> Self {
        Self { layer, direction }
    }

    /// Label written to the `Hook` column of exported rows.
    pub const fn label(self) -> &'static str {
        match (self.layer, self.direction) {
            (Layer::Skb, Direction::Ingress) => "skb_ingress",
            (Layer::Skb, Direction::Egress) => "skb_egress",
            (Layer::Tc, Direction::Ingress) => "tc_ingress",
            (Layer::Tc, Direction::Egress) => "tc_egress",
            (Layer::Xdp, Direction::Ingress) => "xdp_ingress",
            (Layer::Xdp, Direction::Egress) => "xdp_egress",
        }
    }

    /// Name of the counter map inside the probe object.
    pub const fn map_name(self) -> &'static str {
        match (self.layer, self.direction) {
            (Layer::Skb, Direction::Ingress) => "skb_ingress_pkt_count",
            (Layer::Skb, Direction::Egress) => "skb_egress_pkt_count",
            (Layer::Tc, Direction::Ingress) => "tc_ingress_pkt_count",
            (Layer::Tc, Direction::Egress) => "tc_egress_pkt_count",
            (Layer::Xdp, Direction::Ingress) => "xdp_ingress_pkt_count",
            (Layer::Xdp, Direction::Egress) => "xdp_egress_pkt_count",
        }
    }

    /// Name of the probe program inside the probe object, if the hook has one.
    pub const fn program_name(self) -> Option<&'static str> {
        match (self.layer, self.direction) {
            (Layer::Skb, Direction::Ingress) => Some("skb_ingress_pkt_function"),
            (Layer::Skb, Direction::Egress) => Some("skb_egress_pkt_function"),
            (Layer::Tc, Direction::Ingress) => Some("tc_ingress_pkt_function"),
            (Layer::Tc, Direction::Egress) => Some("tc_egress_pkt_function"),
            (Layer::Xdp, Direction::Ingress) => Some("xdp_ingress_pkt_function"),
            (Layer::Xdp, Direction::Egress) => None,
        }
    }

    /// Whether the probe stores the packet length in host order, so decoding must swap it.
    pub const fn stores_native_length(self) -> bool {
        matches!(self.layer, Layer::Xdp)
    }

    /// Counter tables seeded after this hook's attach sweep. The XDP sweep also seeds the egress
    /// table, which no program of its own ever touches.
    pub fn seeded_tables(self) -> &'static [Hook] {
        match (self.layer, self.direction) {
            (Layer::Skb, Direction::Ingress) => &[Hook::SKB_INGRESS],
            (Layer::Skb, Direction::Egress) => &[Hook::SKB_EGRESS],
            (Layer::Tc, Direction::Ingress) => &[Hook::TC_INGRESS],
            (Layer::Tc, Direction::Egress) => &[Hook::TC_EGRESS],
            (Layer::Xdp, Direction::Ingress) => &[Hook::XDP_INGRESS, Hook::XDP_EGRESS],
            (Layer::Xdp, Direction::Egress) => &[Hook::XDP_EGRESS],
        }
    }
}

impl fmt::Display for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
