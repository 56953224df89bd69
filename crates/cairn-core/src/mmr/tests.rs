use proptest::prelude::*;
use sha2::{Digest, Sha256};

use super::*;

/// Appends `leaves` deterministic leaf hashes, returning the full node
/// array including interior nodes.
fn build_nodes(leaves: u64) -> Vec<[u8; 32]> {
    let mut nodes: Vec<[u8; 32]> = Vec::new();
    for l in 0..leaves {
        let leaf: [u8; 32] = Sha256::digest(l.to_be_bytes()).into();
        nodes.push(leaf);
        loop {
            let next = nodes.len() as u64;
            let height = index_height(next);
            if height == 0 {
                break;
            }
            let right = nodes[nodes.len() - 1];
            let left = nodes[(next - 1 - sibling_offset(height - 1)) as usize];
            let mut hasher = Sha256::new();
            hasher.update(left);
            hasher.update(right);
            nodes.push(hasher.finalize().into());
        }
    }
    nodes
}

fn peak_hashes(nodes: &[[u8; 32]], size: u64) -> Vec<[u8; 32]> {
    peaks(size)
        .unwrap()
        .into_iter()
        .map(|p| nodes[p as usize])
        .collect()
}

#[test]
fn heights_of_first_eleven_nodes() {
    //       6
    //     /   \
    //    2     5     9
    //   / \   / \   / \
    //  0   1 3   4 7   8 10
    let expected = [0, 0, 1, 0, 0, 1, 2, 0, 0, 1, 0];
    for (i, &h) in expected.iter().enumerate() {
        assert_eq!(index_height(i as u64), h, "height of node {i}");
    }
}

#[test]
fn leaf_indices_map_to_leaf_positions() {
    let expected = [0, 1, 3, 4, 7, 8, 10, 15, 16, 18];
    for (l, &i) in expected.iter().enumerate() {
        assert_eq!(mmr_index(l as u64), i, "mmr index of leaf {l}");
        assert_eq!(index_height(i), 0, "leaf {l} must be height 0");
    }
}

#[test]
fn peaks_for_known_sizes() {
    assert_eq!(peaks(0).unwrap(), Vec::<u64>::new());
    assert_eq!(peaks(1).unwrap(), vec![0]);
    assert_eq!(peaks(3).unwrap(), vec![2]);
    assert_eq!(peaks(4).unwrap(), vec![2, 3]);
    assert_eq!(peaks(11).unwrap(), vec![6, 9, 10]);
    assert_eq!(peaks(19).unwrap(), vec![14, 17, 18]);
}

#[test]
fn peaks_heights_strictly_decrease() {
    for leaves in 1..200u64 {
        let size = mmr_index(leaves);
        let positions = peaks(size).unwrap();
        let heights: Vec<u8> = positions.iter().map(|&p| index_height(p)).collect();
        for pair in heights.windows(2) {
            assert!(pair[0] > pair[1], "heights must strictly decrease at size {size}");
        }
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }
}

#[test]
fn invalid_sizes_are_rejected() {
    // Size 2 leaves a dangling leaf pair without its parent.
    assert_eq!(peaks(2), Err(MmrError::InvalidSize { size: 2 }));
    assert_eq!(peaks(5), Err(MmrError::InvalidSize { size: 5 }));
    assert_eq!(peaks(9), Err(MmrError::InvalidSize { size: 9 }));
}

#[test]
fn leaf_count_of_known_sizes() {
    assert_eq!(leaf_count(0), 0);
    assert_eq!(leaf_count(1), 1);
    assert_eq!(leaf_count(3), 2);
    assert_eq!(leaf_count(11), 7);
    assert_eq!(leaf_count(19), 11);
}

#[test]
fn inclusion_path_for_leaf_three_of_seven() {
    // Leaf mmr index 3 chains through sibling 4 and aunt 2 to peak 6.
    assert_eq!(inclusion_path(11, 3).unwrap(), vec![4, 2]);
    // The final leaf is itself a peak; the path is empty.
    assert_eq!(inclusion_path(11, 10).unwrap(), Vec::<u64>::new());
}

#[test]
fn inclusion_path_rejects_out_of_range() {
    assert_eq!(
        inclusion_path(11, 11),
        Err(MmrError::OutOfRange { index: 11, size: 11 })
    );
}

#[test]
fn every_node_verifies_against_its_peaks() {
    let leaves = 11u64;
    let size = mmr_index(leaves);
    let nodes = build_nodes(leaves);
    assert_eq!(nodes.len() as u64, size);
    let attested = peak_hashes(&nodes, size);

    for i in 0..size {
        let path = inclusion_path(size, i).unwrap();
        let ok = verify_inclusion(
            &nodes,
            size,
            &nodes[i as usize],
            i,
            &path,
            PeakExpectation::Peaks(&attested),
        )
        .unwrap();
        assert!(ok, "node {i} must verify");
    }
}

#[test]
fn inclusion_verifies_against_bagged_root() {
    let size = mmr_index(7);
    let nodes = build_nodes(7);
    let root = bag_peaks(&peak_hashes(&nodes, size)).unwrap();

    for l in 0..7u64 {
        let i = mmr_index(l);
        let path = inclusion_path(size, i).unwrap();
        let ok = verify_inclusion(
            &nodes,
            size,
            &nodes[i as usize],
            i,
            &path,
            PeakExpectation::Root(&root),
        )
        .unwrap();
        assert!(ok, "leaf {l} must verify against the root");
    }
}

#[test]
fn flipped_leaf_bit_fails_inclusion() {
    let size = mmr_index(8);
    let nodes = build_nodes(8);
    let attested = peak_hashes(&nodes, size);
    let i = mmr_index(5);
    let path = inclusion_path(size, i).unwrap();

    let mut tampered = nodes[i as usize];
    tampered[7] ^= 0x20;
    let ok = verify_inclusion(
        &nodes,
        size,
        &tampered,
        i,
        &path,
        PeakExpectation::Peaks(&attested),
    )
    .unwrap();
    assert!(!ok);
}

#[test]
fn flipped_peak_bit_fails_inclusion() {
    let size = mmr_index(8);
    let nodes = build_nodes(8);
    let mut attested = peak_hashes(&nodes, size);
    attested[0][0] ^= 0x01;
    let i = mmr_index(2);
    let path = inclusion_path(size, i).unwrap();
    let ok = verify_inclusion(
        &nodes,
        size,
        &nodes[i as usize],
        i,
        &path,
        PeakExpectation::Peaks(&attested),
    )
    .unwrap();
    assert!(!ok);
}

#[test]
fn consistency_between_seven_and_eleven_leaves() {
    // State A: 7 leaves, size 11. State B: 11 leaves, size 19, extending A.
    let size_a = mmr_index(7);
    let size_b = mmr_index(11);
    let nodes = build_nodes(11);
    let peaks_a = peak_hashes(&nodes, size_a);
    let peaks_b = peak_hashes(&nodes, size_b);

    let path = consistency_path(size_a, size_b).unwrap();
    let ok = verify_consistency(&nodes, size_a, &peaks_a, size_b, &peaks_b, &path).unwrap();
    assert!(ok);

    // Swapping the states must fail: the newer tree is not a prefix of the
    // older one.
    let reversed =
        verify_consistency(&nodes, size_b, &peaks_b, size_a, &peaks_a, &path).unwrap();
    assert!(!reversed);
}

#[test]
fn consistency_is_reflexive() {
    let size = mmr_index(7);
    let nodes = build_nodes(7);
    let hashes = peak_hashes(&nodes, size);
    let path = consistency_path(size, size).unwrap();
    assert!(path.is_empty());
    let ok = verify_consistency(&nodes, size, &hashes, size, &hashes, &path).unwrap();
    assert!(ok);
}

#[test]
fn consistency_path_rejects_reversed_range() {
    assert_eq!(
        consistency_path(19, 11),
        Err(MmrError::RangeReversed {
            size_a: 19,
            size_b: 11
        })
    );
}

#[test]
fn tampered_old_peak_fails_consistency() {
    let size_a = mmr_index(7);
    let size_b = mmr_index(11);
    let nodes = build_nodes(11);
    let mut peaks_a = peak_hashes(&nodes, size_a);
    peaks_a[1][13] ^= 0x80;
    let peaks_b = peak_hashes(&nodes, size_b);
    let path = consistency_path(size_a, size_b).unwrap();
    let ok = verify_consistency(&nodes, size_a, &peaks_a, size_b, &peaks_b, &path).unwrap();
    assert!(!ok);
}

#[test]
fn short_witness_fails_consistency() {
    let size_a = mmr_index(7);
    let size_b = mmr_index(11);
    let nodes = build_nodes(11);
    let peaks_a = peak_hashes(&nodes, size_a);
    let peaks_b = peak_hashes(&nodes, size_b);
    let mut path = consistency_path(size_a, size_b).unwrap();
    path.pop();
    let ok = verify_consistency(&nodes, size_a, &peaks_a, size_b, &peaks_b, &path).unwrap();
    assert!(!ok);
}

#[test]
fn bag_peaks_folds_right_to_left() {
    let a = [1u8; 32];
    let b = [2u8; 32];
    let c = [3u8; 32];
    let mut h = Sha256::new();
    h.update(c);
    h.update(b);
    let cb: [u8; 32] = h.finalize().into();
    let mut h = Sha256::new();
    h.update(cb);
    h.update(a);
    let expected: [u8; 32] = h.finalize().into();
    assert_eq!(bag_peaks(&[a, b, c]), Some(expected));
    assert_eq!(bag_peaks(&[a]), Some(a));
    assert_eq!(bag_peaks(&[]), None);
}

proptest! {
    #[test]
    fn leaf_count_inverts_mmr_index(l in 0u64..1_000_000) {
        prop_assert_eq!(leaf_count(mmr_index(l) + 1) - 1, l);
    }

    #[test]
    fn mmr_index_always_lands_on_a_leaf(l in 0u64..1_000_000) {
        prop_assert_eq!(index_height(mmr_index(l)), 0);
    }

    #[test]
    fn any_leaf_verifies_in_any_larger_tree(leaves in 1u64..96, pick in 0u64..96) {
        let l = pick % leaves;
        let size = mmr_index(leaves);
        let nodes = build_nodes(leaves);
        let attested = peak_hashes(&nodes, size);
        let i = mmr_index(l);
        let path = inclusion_path(size, i).unwrap();
        let ok = verify_inclusion(
            &nodes,
            size,
            &nodes[i as usize],
            i,
            &path,
            PeakExpectation::Peaks(&attested),
        )
        .unwrap();
        prop_assert!(ok);
    }

    #[test]
    fn append_only_growth_is_always_consistent(a in 1u64..64, b in 1u64..64) {
        let (la, lb) = if a <= b { (a, b) } else { (b, a) };
        let size_a = mmr_index(la);
        let size_b = mmr_index(lb);
        let nodes = build_nodes(lb);
        let peaks_a = peak_hashes(&nodes, size_a);
        let peaks_b = peak_hashes(&nodes, size_b);
        let path = consistency_path(size_a, size_b).unwrap();
        let ok = verify_consistency(&nodes, size_a, &peaks_a, size_b, &peaks_b, &path).unwrap();
        prop_assert!(ok);

        if size_a < size_b {
            let reversed =
                verify_consistency(&nodes, size_b, &peaks_b, size_a, &peaks_a, &path).unwrap();
            prop_assert!(!reversed);
        }
    }
}
