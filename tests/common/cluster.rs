use beacon_consensus::{
    threshold::{self, types::SecretKeyShare},
    types::{
        credentials::NodeCredentials,
        crypto_primitives::SigningKey,
        data_types::GroupID,
        groups::{Group, GroupRegistry},
    },
};
use rand_core::OsRng;

/// Create `n` signing keys.
pub(crate) fn signing_keys(n: usize) -> Vec<SigningKey> {
    let mut csprg = OsRng {};
    (0..n).map(|_| SigningKey::generate(&mut csprg)).collect()
}

/// Deal a group whose member with index `i` is `members[i]`, returning the group and the members'
/// secret key shares in the same order.
pub(crate) fn deal_group(members: &[SigningKey], threshold: u32) -> (Group, Vec<SecretKeyShare>) {
    let mut csprg = OsRng {};
    let (public_polynomial, shares) =
        threshold::deal(members.len() as u32, threshold, &mut csprg).unwrap();
    let members = members
        .iter()
        .map(|key| key.verifying_key().to_bytes())
        .collect();
    (Group::new(members, public_polynomial), shares)
}

/// Deal `num_groups` groups of `group_size` members each out of the nodes with `keys`, and build every
/// node's credentials.
///
/// Groups are dealt to consecutive nodes: member `i` of group `g` is the node
/// `(g * group_size + i) % keys.len()`. So groups are disjoint while there are enough nodes, and
/// `group_size` must not exceed the number of nodes.
pub(crate) fn deal_cluster(
    keys: &[SigningKey],
    num_groups: u32,
    group_size: u32,
    threshold: u32,
) -> (GroupRegistry, Vec<NodeCredentials>) {
    let n = keys.len();
    let mut groups = Vec::new();
    let mut memberships: Vec<Vec<(GroupID, SecretKeyShare)>> = vec![Vec::new(); n];

    for g in 0..num_groups as usize {
        let member_nodes: Vec<usize> = (0..group_size as usize)
            .map(|i| (g * group_size as usize + i) % n)
            .collect();
        let member_keys: Vec<SigningKey> = member_nodes.iter().map(|&node| keys[node].clone()).collect();
        let (group, shares) = deal_group(&member_keys, threshold);
        groups.push(group);
        for (node, share) in member_nodes.into_iter().zip(shares) {
            memberships[node].push((GroupID::new(g as u32), share));
        }
    }

    let credentials = keys
        .iter()
        .zip(memberships)
        .map(|(key, memberships)| {
            let (group_ids, shares): (Vec<GroupID>, Vec<SecretKeyShare>) =
                memberships.into_iter().unzip();
            NodeCredentials::new(
                key,
                group_ids,
                shares.iter().map(|share| share.to_bytes()).collect(),
            )
        })
        .collect();

    (GroupRegistry::new(groups), credentials)
}
