use std::sync::Arc;

/// Where the command dispatcher hands committed envelopes.
///
/// Publication runs after the append succeeded, so a failing publish leaves
/// the event stored; implementations must tolerate seeing an envelope again.
pub trait EventBus<M>: Send + Sync {
    type Error: core::fmt::Debug + Send + Sync + 'static;

    fn publish(&self, message: M) -> Result<(), Self::Error>;
}

impl<M, B> EventBus<M> for Arc<B>
where
    B: EventBus<M> + ?Sized,
{
    type Error = B::Error;

    fn publish(&self, message: M) -> Result<(), Self::Error> {
        (**self).publish(message)
    }
}
