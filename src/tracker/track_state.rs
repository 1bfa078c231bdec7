/// Per-round freshness of a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackState {
    /// Matched or created in the current detection batch
    #[default]
    Refreshed,
    /// Not matched this batch but still inside the track timeout
    Coasting,
    /// Past the track timeout; dropped at the end of the batch
    Expired,
}
