use slotmap::new_key_type;

new_key_type! {
    /// Handle to an atom. Cloning a topology preserves every handle, so an atom that
    /// survives an edit of the clone keeps the same `AtomId` in both topologies.
    pub struct AtomId;
    /// Handle to a residue.
    pub struct ResidueId;
    /// Handle to a chain.
    pub struct ChainId;
}
