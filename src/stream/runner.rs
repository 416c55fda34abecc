//! Runners: drain a stream into a terminal value
//!
//! Every runner is a loop over [`Stream::uncons`]. Dropping a runner's future
//! part-way drops the remaining stream, which cancels its workers.

use std::future::Future;
use std::ops::{Add, Mul};

use async_stream::stream;
use futures_util::stream::{BoxStream, StreamExt};

use crate::error::StreamResult;
use crate::policy::Policy;

use super::core::Stream;

impl<T: Send + 'static, P: Policy> Stream<T, P> {
    /// Run for effects, discarding the values.
    pub async fn run(self) -> StreamResult<()> {
        self.foldl((), |(), _| ()).await
    }

    /// Collect every value.
    pub async fn to_list(self) -> StreamResult<Vec<T>> {
        self.foldl(Vec::new(), |mut acc, item| {
            acc.push(item);
            acc
        })
        .await
    }

    /// Left fold.
    pub async fn foldl<B, F>(self, init: B, mut f: F) -> StreamResult<B>
    where
        F: FnMut(B, T) -> B,
    {
        let mut acc = init;
        let mut stream = self;
        while let Some((item, rest)) = stream.uncons().await? {
            acc = f(acc, item);
            stream = rest;
        }
        Ok(acc)
    }

    /// Left fold with an effectful step.
    pub async fn foldl_m<B, F, Fut>(self, init: B, mut f: F) -> StreamResult<B>
    where
        F: FnMut(B, T) -> Fut,
        Fut: Future<Output = StreamResult<B>>,
    {
        let mut acc = init;
        let mut stream = self;
        while let Some((item, rest)) = stream.uncons().await? {
            acc = f(acc, item).await?;
            stream = rest;
        }
        Ok(acc)
    }

    /// Right fold. Drains the stream first, so it needs a finite stream.
    pub async fn foldr<B, F>(self, init: B, mut f: F) -> StreamResult<B>
    where
        F: FnMut(T, B) -> B,
    {
        let items = self.to_list().await?;
        Ok(items.into_iter().rev().fold(init, |acc, item| f(item, acc)))
    }

    /// Run an effect for every value.
    pub async fn for_each_m<F, Fut>(self, mut f: F) -> StreamResult<()>
    where
        F: FnMut(T) -> Fut,
        Fut: Future<Output = StreamResult<()>>,
    {
        self.foldl_m((), |(), item| f(item)).await
    }

    pub async fn length(self) -> StreamResult<usize> {
        self.foldl(0, |n, _| n + 1).await
    }

    pub async fn sum(self) -> StreamResult<T>
    where
        T: Add<Output = T> + Default,
    {
        self.foldl(T::default(), |acc, item| acc + item).await
    }

    pub async fn product(self) -> StreamResult<T>
    where
        T: Mul<Output = T> + From<u8>,
    {
        self.foldl(T::from(1), |acc, item| acc * item).await
    }

    /// First value; the rest of the stream is dropped unevaluated.
    pub async fn head(self) -> StreamResult<Option<T>> {
        Ok(self.uncons().await?.map(|(item, _)| item))
    }

    pub async fn last(self) -> StreamResult<Option<T>> {
        self.foldl(None, |_, item| Some(item)).await
    }

    /// Whether the stream has no values. Evaluates at most one step.
    pub async fn null(self) -> StreamResult<bool> {
        Ok(self.uncons().await?.is_none())
    }

    /// Whether `value` occurs; stops at the first match.
    pub async fn elem(self, value: &T) -> StreamResult<bool>
    where
        T: PartialEq,
    {
        self.any(|item| item == value).await
    }

    /// Whether every value satisfies `predicate`; stops at the first miss.
    pub async fn all<F>(self, mut predicate: F) -> StreamResult<bool>
    where
        F: FnMut(&T) -> bool,
    {
        Ok(!self.any(|item| !predicate(item)).await?)
    }

    /// Whether some value satisfies `predicate`; stops at the first hit.
    pub async fn any<F>(self, mut predicate: F) -> StreamResult<bool>
    where
        F: FnMut(&T) -> bool,
    {
        let mut stream = self;
        while let Some((item, rest)) = stream.uncons().await? {
            if predicate(&item) {
                return Ok(true);
            }
            stream = rest;
        }
        Ok(false)
    }

    pub async fn maximum(self) -> StreamResult<Option<T>>
    where
        T: Ord,
    {
        self.foldl(None, |best: Option<T>, item| match best {
            Some(best) if best >= item => Some(best),
            _ => Some(item),
        })
        .await
    }

    pub async fn minimum(self) -> StreamResult<Option<T>>
    where
        T: Ord,
    {
        self.foldl(None, |best: Option<T>, item| match best {
            Some(best) if best <= item => Some(best),
            _ => Some(item),
        })
        .await
    }

    /// Hand the stream to `futures`/`tokio-stream` consumers. A failure is yielded
    /// as the last item.
    pub fn into_futures_stream(self) -> BoxStream<'static, StreamResult<T>> {
        stream! {
            let mut stream = self;
            loop {
                match stream.uncons().await {
                    Ok(Some((item, rest))) => {
                        yield Ok(item);
                        stream = rest;
                    }
                    Ok(None) => break,
                    Err(err) => {
                        yield Err(err);
                        break;
                    }
                }
            }
        }
        .boxed()
    }
}
