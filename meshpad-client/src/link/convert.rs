//! Conversions between wire types and webrtc-rs types.

use crate::error::LinkError;
use meshpad_core::{IceCandidate, IceServerConfig, SdpKind, SessionDescription};
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::peer_connection::sdp::sdp_type::RTCSdpType;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;

pub(crate) fn ice_servers(configs: &[IceServerConfig]) -> Vec<RTCIceServer> {
    configs
        .iter()
        .filter(|server| !server.urls.is_empty())
        .map(|server| RTCIceServer {
            urls: server.urls.clone(),
            username: server.username.clone().unwrap_or_default(),
            credential: server.credential.clone().unwrap_or_default(),
        })
        .collect()
}

pub(crate) fn to_rtc_description(
    description: &SessionDescription,
) -> Result<RTCSessionDescription, LinkError> {
    let sdp = description.sdp.clone();
    let parsed = match description.kind {
        SdpKind::Offer => RTCSessionDescription::offer(sdp),
        SdpKind::Answer => RTCSessionDescription::answer(sdp),
        SdpKind::Pranswer => RTCSessionDescription::pranswer(sdp),
        SdpKind::Rollback => {
            return Err(LinkError::Description(
                "rollback descriptions are not supported".to_string(),
            ));
        }
    };
    parsed.map_err(|e| LinkError::Description(e.to_string()))
}

pub(crate) fn from_rtc_description(
    description: &RTCSessionDescription,
) -> Result<SessionDescription, LinkError> {
    let kind = match description.sdp_type {
        RTCSdpType::Offer => SdpKind::Offer,
        RTCSdpType::Answer => SdpKind::Answer,
        RTCSdpType::Pranswer => SdpKind::Pranswer,
        RTCSdpType::Rollback => SdpKind::Rollback,
        RTCSdpType::Unspecified => {
            return Err(LinkError::Description(
                "local description has no type".to_string(),
            ));
        }
    };
    Ok(SessionDescription {
        kind,
        sdp: description.sdp.clone(),
    })
}

pub(crate) fn to_rtc_candidate(candidate: IceCandidate) -> RTCIceCandidateInit {
    RTCIceCandidateInit {
        candidate: candidate.candidate,
        sdp_mid: candidate.sdp_mid,
        sdp_mline_index: candidate.sdp_m_line_index,
        username_fragment: candidate.username_fragment,
    }
}

pub(crate) fn from_rtc_candidate(candidate: &RTCIceCandidate) -> Result<IceCandidate, LinkError> {
    let init = candidate.to_json()?;
    Ok(IceCandidate {
        candidate: init.candidate,
        sdp_mid: init.sdp_mid,
        sdp_m_line_index: init.sdp_mline_index,
        username_fragment: init.username_fragment,
    })
}
