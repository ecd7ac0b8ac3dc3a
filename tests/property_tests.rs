//! Property tests for maze generation

use mazeshooter::domain::maze::{generate, generate_with_rng};
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn prop_start_and_exit_always_open(seed in any::<u64>(), width in 3usize..40, height in 3usize..40) {
        let grid = generate(width, height, Some(seed)).unwrap();
        let (sx, sy) = grid.start_cell();
        let (ex, ey) = grid.exit_cell();
        prop_assert!(grid.is_open(sx, sy));
        prop_assert!(grid.is_open(ex, ey));
        prop_assert_eq!((ex, ey), (width - 1, height - 2));
    }

    #[test]
    fn prop_every_open_cell_reachable(seed in any::<u64>(), width in 3usize..40, height in 3usize..40, chance in 0.0f64..=1.0) {
        let grid = generate_with_rng(width, height, chance, &mut StdRng::seed_from_u64(seed)).unwrap();
        prop_assert!(grid.is_connected(), "disconnected maze for seed={seed}:\n{grid}");
    }

    #[test]
    fn prop_border_is_wall_except_exit(seed in any::<u64>(), width in 3usize..30, height in 3usize..30) {
        let grid = generate(width, height, Some(seed)).unwrap();
        let exit = grid.exit_cell();
        for x in 0..width {
            prop_assert!(!grid.is_open(x, 0));
            prop_assert!(!grid.is_open(x, height - 1));
        }
        for y in 0..height {
            prop_assert!(!grid.is_open(0, y));
            prop_assert_eq!(grid.is_open(width - 1, y), (width - 1, y) == exit);
        }
    }

    #[test]
    fn prop_seeded_generation_is_deterministic(seed in any::<u64>(), width in 3usize..30, height in 3usize..30) {
        let a = generate(width, height, Some(seed)).unwrap();
        let b = generate(width, height, Some(seed)).unwrap();
        prop_assert_eq!(a.to_rows(), b.to_rows());
    }
}
