use crate::block::BlockRef;

/// Core trait for audio processing nodes.
///
/// The host graph calls [`update`](AudioNode::update) exactly once per audio
/// block per node, in a topologically consistent order. `inputs` carries one
/// optional shared block per input channel (`None` means no signal this
/// cycle); placing a block into `outputs[n]` transmits it on output channel
/// `n`, leaving `None` transmits nothing. Nodes allocate output blocks from
/// the global pool themselves, which lets a node pass its input straight
/// through by cloning the reference.
pub trait AudioNode {
    /// Number of input channels this node accepts.
    const NUM_INPUTS: usize;

    /// Number of output channels this node produces.
    const NUM_OUTPUTS: usize;

    /// Process one block of audio.
    fn update(&mut self, inputs: &[Option<BlockRef>], outputs: &mut [Option<BlockRef>]);
}
