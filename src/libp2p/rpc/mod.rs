// Copyright 2022-2023 Lantern Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

use std::io;
use std::marker::PhantomData;

use async_trait::async_trait;
use futures::prelude::*;
use libp2p::core::ProtocolName;
use libp2p::request_response::{OutboundFailure, RequestResponseCodec};
use serde::{de::DeserializeOwned, Serialize};

use crate::encoding::{from_slice, to_vec};

/// Generic Cbor RequestResponse codec. This satisfies
/// [`RequestResponseCodec`] for the Hello and ChainExchange protocols
/// without duplication.
#[derive(Clone)]
pub struct CborRequestResponse<P, RQ, RS> {
    protocol: PhantomData<P>,
    request: PhantomData<RQ>,
    response: PhantomData<RS>,
}

impl<P, RQ, RS> Default for CborRequestResponse<P, RQ, RS> {
    fn default() -> Self {
        Self {
            protocol: PhantomData::<P>,
            request: PhantomData::<RQ>,
            response: PhantomData::<RS>,
        }
    }
}

/// Libp2p request-response outbound error type. This indicates a failure
/// sending a request to a peer, as opposed to a failure response from a
/// node. Mirrors the internal libp2p type so it does not leak out of this
/// module's API.
#[derive(Debug)]
pub enum RequestResponseError {
    /// The request could not be sent because a dialing attempt failed.
    DialFailure,
    /// The request timed out before a response was received. It is not
    /// known whether the request was received by the remote peer.
    Timeout,
    /// The connection closed before a response was received.
    ConnectionClosed,
    /// The remote supports none of the requested protocols.
    UnsupportedProtocols,
}

impl From<OutboundFailure> for RequestResponseError {
    fn from(err: OutboundFailure) -> Self {
        match err {
            OutboundFailure::DialFailure => Self::DialFailure,
            OutboundFailure::Timeout => Self::Timeout,
            OutboundFailure::ConnectionClosed => Self::ConnectionClosed,
            OutboundFailure::UnsupportedProtocols => Self::UnsupportedProtocols,
        }
    }
}

impl std::fmt::Display for RequestResponseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DialFailure => write!(f, "dial failure"),
            Self::Timeout => write!(f, "request timed out"),
            Self::ConnectionClosed => write!(f, "connection closed"),
            Self::UnsupportedProtocols => write!(f, "unsupported protocols"),
        }
    }
}

impl std::error::Error for RequestResponseError {}

#[async_trait]
impl<P, RQ, RS> RequestResponseCodec for CborRequestResponse<P, RQ, RS>
where
    P: ProtocolName + Send + Clone,
    RQ: Serialize + DeserializeOwned + Send + Sync,
    RS: Serialize + DeserializeOwned + Send + Sync,
{
    type Protocol = P;
    type Request = RQ;
    type Response = RS;

    async fn read_request<T>(&mut self, _: &Self::Protocol, io: &mut T) -> io::Result<Self::Request>
    where
        T: AsyncRead + Unpin + Send,
    {
        read_and_decode(io).await
    }

    async fn read_response<T>(
        &mut self,
        _: &Self::Protocol,
        io: &mut T,
    ) -> io::Result<Self::Response>
    where
        T: AsyncRead + Unpin + Send,
    {
        read_and_decode(io).await
    }

    async fn write_request<T>(
        &mut self,
        _: &Self::Protocol,
        io: &mut T,
        req: Self::Request,
    ) -> io::Result<()>
    where
        T: AsyncWrite + Unpin + Send,
    {
        encode_and_write(io, req).await
    }

    async fn write_response<T>(
        &mut self,
        _: &Self::Protocol,
        io: &mut T,
        res: Self::Response,
    ) -> io::Result<()>
    where
        T: AsyncWrite + Unpin + Send,
    {
        encode_and_write(io, res).await
    }
}

/// Frames are not length prefixed; the remote half-closes the stream after
/// writing, so read to the end and decode the single value.
async fn read_and_decode<IO, T>(io: &mut IO) -> io::Result<T>
where
    IO: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    // messages over 2MiB are likely malicious
    const MAX_BYTES_ALLOWED: u64 = 2 * 1024 * 1024;

    let mut bytes = vec![];
    io.take(MAX_BYTES_ALLOWED).read_to_end(&mut bytes).await?;
    from_slice(&bytes).map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))
}

async fn encode_and_write<IO, T>(io: &mut IO, data: T) -> io::Result<()>
where
    IO: AsyncWrite + Unpin,
    T: Serialize,
{
    let bytes = to_vec(&data).map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
    io.write_all(&bytes).await?;
    io.close().await?;
    Ok(())
}
