//! Serde models of `aws ec2 describe-instances --output json`.

use serde::Deserialize;

/// Top-level response body.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct DescribeInstances {
    /// Reservations in response order.
    #[serde(default)]
    pub reservations: Vec<Reservation>,
}

impl DescribeInstances {
    /// Iterates every instance across all reservations, in response order.
    pub fn instances(&self) -> impl Iterator<Item = &Instance> {
        self.reservations
            .iter()
            .flat_map(|reservation| reservation.instances.iter())
    }
}

/// One reservation grouping instances launched together.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct Reservation {
    /// Instances in the reservation.
    #[serde(default)]
    pub instances: Vec<Instance>,
}

/// The instance fields the tool reads.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct Instance {
    /// Identifier such as `i-0123456789abcdef0`.
    #[serde(default)]
    pub instance_id: String,
    /// Public IPv4 address, absent for private or stopped instances.
    #[serde(default)]
    pub public_ip_address: Option<String>,
    /// Tags attached to the instance.
    #[serde(default)]
    pub tags: Vec<Tag>,
}

/// One key/value tag.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct Tag {
    /// Tag key.
    pub key: String,
    /// Tag value.
    #[serde(default)]
    pub value: String,
}
