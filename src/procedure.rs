//! The user-supplied function executed inside each worker.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;

/// A single-argument, single-return function that a [`Pool`](crate::Pool)
/// runs inside its workers.
///
/// Because the only thing that crosses a worker channel is an encoded record,
/// `Input` and `Output` must be serializable in both directions, but they do
/// not need to be `Send`: the controller encodes before sending and the
/// worker decodes after receiving. The procedure itself is cloned into every
/// worker, so it must be `Send + Clone`, and it must not rely on any state
/// shared with the controller.
pub trait Procedure: Send + Clone + 'static {
    /// The type of the input to this function.
    type Input: Serialize + DeserializeOwned;
    /// The type of the output from this function.
    type Output: Serialize + DeserializeOwned;

    /// Applies this procedure to one task.
    fn apply(&mut self, input: Self::Input) -> Self::Output;
}

/// Wraps a closure or function pointer as a [`Procedure`]. The function must
/// be `FnMut` *and* `Clone`able, since each worker runs its own copy.
pub struct Call<I, O, F> {
    f: F,
    marker: PhantomData<fn(I) -> O>,
}

impl<I, O, F> From<F> for Call<I, O, F>
where
    I: Serialize + DeserializeOwned + 'static,
    O: Serialize + DeserializeOwned + 'static,
    F: FnMut(I) -> O + Clone + Send + 'static,
{
    fn from(f: F) -> Self {
        Call {
            f,
            marker: PhantomData,
        }
    }
}

impl<I, O, F: Clone> Clone for Call<I, O, F> {
    fn clone(&self) -> Self {
        Call {
            f: self.f.clone(),
            marker: PhantomData,
        }
    }
}

impl<I, O, F> Procedure for Call<I, O, F>
where
    I: Serialize + DeserializeOwned + 'static,
    O: Serialize + DeserializeOwned + 'static,
    F: FnMut(I) -> O + Clone + Send + 'static,
{
    type Input = I;
    type Output = O;

    #[inline]
    fn apply(&mut self, input: I) -> O {
        (self.f)(input)
    }
}

#[cfg(test)]
mod tests {
    use super::{Call, Procedure};

    #[test]
    fn test_call_applies_closure() {
        let mut call = Call::from(|x: u32| x + 1);
        assert_eq!(call.apply(5), 6);
    }

    #[test]
    fn test_call_clones_captured_state() {
        let offset = 10u32;
        let call = Call::from(move |x: u32| x + offset);
        let mut cloned = call.clone();
        assert_eq!(cloned.apply(1), 11);
    }
}
