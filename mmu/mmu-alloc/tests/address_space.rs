use mmu_addresses::{
    PageGeometry, PageOffset, Pages4KLevels3, Pages4KLevels4, Pages64Levels2, VirtualAddress,
};
use mmu_alloc::FrameArena;
use mmu_vmem::{AddressSpace, AllocateError, NOT_MAPPED};
use proptest::prelude::*;

type Space<G> = AddressSpace<G, FrameArena<G>>;

fn space<G: PageGeometry>() -> Space<G> {
    AddressSpace::new(FrameArena::new())
}

/// 60 levels of 2 entries over 16-byte pages: every one of the 64 address
/// bits selects a table entry or an offset byte.
#[derive(Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
struct FullWidth;

impl core::fmt::Display for FullWidth {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(Self::as_str())
    }
}

impl PageGeometry for FullWidth {
    const POBITS: u32 = 4;
    const LEVELS: u32 = 60;

    fn as_str() -> &'static str {
        "16/60"
    }
}

#[test]
fn reference_address_needs_four_pages() {
    let mut aspace = space::<Pages4KLevels3>();
    let va = VirtualAddress::new(0x12_3456);

    let leaf = aspace.allocate(va).unwrap();
    assert_eq!(aspace.page_count(), 4);
    assert_eq!(aspace.backend().live_frames(), 4);

    let pa = aspace.translate(va).unwrap();
    assert_eq!(pa.page::<Pages4KLevels3>(), leaf);
    assert_eq!(pa.as_u64() & 0xFFF, 0x456);
}

#[test]
fn zero_and_max_addresses() {
    let mut aspace = space::<Pages4KLevels3>();
    let zero = VirtualAddress::zero();
    let max = VirtualAddress::new(u64::MAX);

    let low = aspace.allocate(zero).unwrap();
    let high = aspace.allocate(max).unwrap();
    assert_ne!(low, high);

    assert_eq!(aspace.translate(zero).unwrap(), low.base());
    assert_eq!(aspace.translate(max).unwrap().as_u64(), high.base().as_u64() | 0xFFF);
}

#[test]
fn zero_and_max_addresses_full_width() {
    let mut aspace = space::<FullWidth>();
    let zero = VirtualAddress::zero();
    let max = VirtualAddress::new(u64::MAX);

    let low = aspace.allocate(zero).unwrap();
    let high = aspace.allocate(max).unwrap();
    assert_ne!(low, high);

    // The two chains only share the root.
    assert_eq!(aspace.page_count(), 1 + 2 * 60);
    assert_eq!(aspace.translate(max).unwrap().as_u64() & 0xF, 0xF);
    assert_eq!(aspace.translate(VirtualAddress::new(1 << 63)), None);
}

#[test]
fn bits_above_the_span_alias() {
    type G = Pages4KLevels3;
    let mut aspace = space::<G>();
    let va = VirtualAddress::new(0x0000_0012_3456_7ABC);
    let aliased = VirtualAddress::new(va.as_u64() | (0xFFFF_FF80 << 32));

    aspace.allocate(va).unwrap();
    assert_eq!(aspace.translate(aliased), aspace.translate(va));
}

#[test]
fn raw_translation_uses_all_ones_sentinel() {
    let mut aspace = space::<Pages4KLevels3>();
    assert_eq!(aspace.translate_raw(0x12_3456), NOT_MAPPED);

    aspace.allocate(VirtualAddress::new(0x12_3456)).unwrap();
    let pa = aspace.translate_raw(0x12_3456);
    assert_ne!(pa, NOT_MAPPED);
    assert_eq!(pa & 0xFFF, 0x456);
    assert_eq!(aspace.translate_raw(0x12_4456), NOT_MAPPED);
}

#[test]
fn neighbours_in_the_last_level_share_tables() {
    type G = Pages4KLevels3;
    let mut aspace = space::<G>();
    let a = VirtualAddress::from_vpns::<G>(&[3, 7, 11], PageOffset::new(0x10));
    let b = VirtualAddress::from_vpns::<G>(&[3, 7, 12], PageOffset::new(0x10));

    let leaf_a = aspace.allocate(a).unwrap();
    let before = aspace.page_count();
    let leaf_b = aspace.allocate(b).unwrap();

    assert_ne!(leaf_a, leaf_b);
    assert_eq!(aspace.page_count(), before + 1);
}

#[test]
fn different_upper_levels_use_different_leaves() {
    type G = Pages4KLevels3;
    let mut aspace = space::<G>();
    let a = VirtualAddress::from_vpns::<G>(&[1, 2, 3], PageOffset::new(0));
    let b = VirtualAddress::from_vpns::<G>(&[2, 2, 3], PageOffset::new(0));
    let c = VirtualAddress::from_vpns::<G>(&[1, 3, 3], PageOffset::new(0));

    let leaves = [
        aspace.allocate(a).unwrap(),
        aspace.allocate(b).unwrap(),
        aspace.allocate(c).unwrap(),
    ];
    assert_ne!(leaves[0], leaves[1]);
    assert_ne!(leaves[0], leaves[2]);
    assert_ne!(leaves[1], leaves[2]);

    // root, 2 level-1 tables, 3 level-2 tables, 3 leaves
    assert_eq!(aspace.page_count(), 9);
}

#[test]
fn exhaustive_small_geometry() {
    type G = Pages64Levels2;
    let mut aspace = space::<G>();
    let allocated_pages = [0u64, 1, 9, 17, 63];
    for page in allocated_pages {
        aspace.allocate(VirtualAddress::new(page << G::POBITS)).unwrap();
    }

    for raw in 0..(1u64 << G::VA_BITS) {
        let va = VirtualAddress::new(raw);
        let expected = allocated_pages.contains(&(raw >> G::POBITS));
        match aspace.translate(va) {
            Some(pa) => {
                assert!(expected, "{va} unexpectedly mapped");
                assert_eq!(pa.offset::<G>(), va.offset::<G>());
            }
            None => assert!(!expected, "{va} unexpectedly unmapped"),
        }
    }
}

#[test]
fn independent_address_spaces() {
    let mut first = space::<Pages4KLevels3>();
    let second = space::<Pages4KLevels3>();
    let va = VirtualAddress::new(0x4000);

    first.allocate(va).unwrap();
    assert!(first.is_mapped(va));
    assert!(!second.is_mapped(va));
    assert!(!second.is_active());
}

#[test]
fn release_returns_every_frame() {
    let mut arena = FrameArena::<Pages4KLevels4>::new();
    {
        let mut aspace = AddressSpace::<Pages4KLevels4, _>::new(&mut arena);
        for i in 0..32u64 {
            aspace.allocate(VirtualAddress::new(i * 0x1234_5000)).unwrap();
        }
        let pages = aspace.page_count();
        assert_eq!(aspace.release(), pages);
        assert_eq!(aspace.backend().live_frames(), 0);

        // Usable again after a release.
        aspace.allocate(VirtualAddress::new(0x1000)).unwrap();
    }
    assert_eq!(arena.live_frames(), 0);
}

#[test]
fn frame_budget_surfaces_as_error() {
    let mut aspace = AddressSpace::<Pages4KLevels3, _>::new(FrameArena::with_limit(3));
    let va = VirtualAddress::new(0x12_3456);
    assert_eq!(aspace.allocate(va), Err(AllocateError::OomLevel { level: 2 }));
    assert!(!aspace.is_mapped(va));

    // Freeing the partial chain makes room for the full one.
    assert_eq!(aspace.release(), 3);
    let mut aspace = AddressSpace::<Pages4KLevels3, _>::new(FrameArena::with_limit(4));
    assert!(aspace.allocate(va).is_ok());
}

proptest! {
    #[test]
    fn unmapped_by_default(va in any::<u64>()) {
        let aspace = space::<Pages4KLevels3>();
        prop_assert_eq!(aspace.translate(VirtualAddress::new(va)), None);
    }

    #[test]
    fn allocate_then_translate_preserves_offset(va in any::<u64>()) {
        let mut aspace = space::<Pages4KLevels4>();
        let va = VirtualAddress::new(va);
        let leaf = aspace.allocate(va).unwrap();
        let pa = aspace.translate(va).unwrap();
        prop_assert_eq!(pa.as_u64() & Pages4KLevels4::OFFSET_MASK, va.as_u64() & Pages4KLevels4::OFFSET_MASK);
        prop_assert_eq!(pa.page::<Pages4KLevels4>(), leaf);
    }

    #[test]
    fn allocate_is_idempotent(vas in proptest::collection::vec(any::<u64>(), 1..16)) {
        let mut aspace = space::<Pages4KLevels3>();
        let first: Vec<_> = vas.iter().map(|va| aspace.allocate(VirtualAddress::new(*va)).unwrap()).collect();
        let frames = aspace.backend().live_frames();
        let pages = aspace.page_count();
        let second: Vec<_> = vas.iter().map(|va| aspace.allocate(VirtualAddress::new(*va)).unwrap()).collect();
        prop_assert_eq!(first, second);
        prop_assert_eq!(aspace.backend().live_frames(), frames);
        prop_assert_eq!(aspace.page_count(), pages);
    }

    #[test]
    fn same_page_shares_leaf(va in any::<u64>(), other_offset in 0u64..4096) {
        type G = Pages4KLevels3;
        let mut aspace = space::<G>();
        let a = VirtualAddress::new(va);
        let b = VirtualAddress::new((va & !G::OFFSET_MASK) | other_offset);
        aspace.allocate(a).unwrap();

        let pa = aspace.translate(a).unwrap();
        let pb = aspace.translate(b).unwrap();
        prop_assert_eq!(pa.page::<G>(), pb.page::<G>());
        prop_assert_eq!(pa.as_u64() ^ pb.as_u64(), a.as_u64() ^ b.as_u64());
    }

    #[test]
    fn distinct_pages_get_distinct_leaves(a in any::<u64>(), b in any::<u64>()) {
        type G = Pages4KLevels3;
        let a = VirtualAddress::new(a);
        let b = VirtualAddress::new(b);
        let same_page = (0..G::LEVELS).all(|level| a.vpn::<G>(level) == b.vpn::<G>(level));

        let mut aspace = space::<G>();
        let leaf_a = aspace.allocate(a).unwrap();
        let leaf_b = aspace.allocate(b).unwrap();
        prop_assert_eq!(leaf_a == leaf_b, same_page);
    }
}
