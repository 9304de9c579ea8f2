//! Analog quantization tables

use crate::state::StickPosition;

/// Stick cluster centers: neutral, cardinals, half-tilts, diagonals, and the
/// angles used for wavedash and shield-drop inputs.
pub const STICK_CLUSTER_CENTERS: [[f32; 2]; 21] = [
    [0.5, 0.5],
    [1.0, 0.5],
    [0.0, 0.5],
    [0.5, 0.0],
    [0.5, 1.0],
    [0.5, 0.25],
    [0.5, 0.75],
    [0.75, 0.5],
    [0.25, 0.5],
    [0.15, 0.15],
    [0.85, 0.15],
    [0.85, 0.85],
    [0.15, 0.85],
    [0.28, 0.93],
    [0.28, 0.07],
    [0.72, 0.07],
    [0.72, 0.93],
    [0.07, 0.28],
    [0.07, 0.72],
    [0.93, 0.72],
    [0.93, 0.28],
];

/// Released, light press, full press.
pub const SHOULDER_CLUSTER_CENTERS: [f32; 3] = [0.0, 0.4, 1.0];

/// Index of the closest stick cluster. Ties go to the lower index.
pub fn nearest_stick_cluster(position: StickPosition) -> usize {
    let mut best = 0;
    let mut best_distance = f32::INFINITY;
    for (i, [x, y]) in STICK_CLUSTER_CENTERS.iter().enumerate() {
        let distance = (position.x - x).powi(2) + (position.y - y).powi(2);
        if distance < best_distance {
            best = i;
            best_distance = distance;
        }
    }
    best
}

pub fn stick_cluster_center(index: usize) -> Option<StickPosition> {
    STICK_CLUSTER_CENTERS
        .get(index)
        .map(|&[x, y]| StickPosition::new(x, y))
}

pub fn nearest_shoulder_cluster(value: f32) -> usize {
    let mut best = 0;
    for (i, center) in SHOULDER_CLUSTER_CENTERS.iter().enumerate() {
        if (value - center).abs() < (value - SHOULDER_CLUSTER_CENTERS[best]).abs() {
            best = i;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_centers_map_to_themselves() {
        for (i, &[x, y]) in STICK_CLUSTER_CENTERS.iter().enumerate() {
            assert_eq!(nearest_stick_cluster(StickPosition::new(x, y)), i);
            assert_eq!(stick_cluster_center(i), Some(StickPosition::new(x, y)));
        }
        assert_eq!(stick_cluster_center(21), None);
    }

    #[test]
    fn test_nearby_positions_snap_to_cluster() {
        assert_eq!(nearest_stick_cluster(StickPosition::new(0.52, 0.49)), 0);
        assert_eq!(nearest_stick_cluster(StickPosition::new(0.98, 0.55)), 1);
        assert_eq!(nearest_stick_cluster(StickPosition::new(0.1, 0.12)), 9);
    }

    #[test]
    fn test_shoulder_clusters() {
        assert_eq!(nearest_shoulder_cluster(0.0), 0);
        assert_eq!(nearest_shoulder_cluster(0.35), 1);
        assert_eq!(nearest_shoulder_cluster(0.9), 2);
    }
}
