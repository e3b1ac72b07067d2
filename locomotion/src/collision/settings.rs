/*!
Collision query tolerances.

These constants centralize the small world-space tolerances used by the broad phase and
narrow-phase wrappers. Per-character tuning lives in `ControllerConfig`.

Notes
- Distances are level units (one sector = 1024).
- Favor practical world-space tolerances over machine epsilon for robust behavior.
*/

/// Casts shorter than this (squared) are skipped.
pub const MIN_CAST_LENGTH_SQ: f32 = 1.0e-6;

/// Margin added to query AABBs so grazing candidates are not pruned.
pub const QUERY_AABB_MARGIN: f32 = 1.0;

/// Contact prediction distance for manifold queries. Zero reports only touching or
/// overlapping pairs.
pub const CONTACT_PREDICTION: f32 = 0.0;
