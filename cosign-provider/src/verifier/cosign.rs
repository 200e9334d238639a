// Copyright (c) 2026 The Cosign Provider Authors
//
// SPDX-License-Identifier: Apache-2.0
//

//! Cosign verification of certificate-signed images.
//!
//! The signature image `<repo>:sha256-<digest>.sig` is pulled from the
//! registry of the image. Each of its layers carries a simple signing
//! payload, the base64 signature of that payload and the PEM signing
//! certificate, optionally with the intermediates in a chain annotation.
//! No transparency log is consulted.

use std::{collections::BTreeMap, str::FromStr};

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use log::{debug, info, warn};
use oci_client::{client::ImageLayer, Client, Reference};
use rustls_pki_types::{CertificateDer, TrustAnchor, UnixTime};
use sigstore::{
    cosign::payload::simple_signing::SimpleSigning,
    crypto::{CosignVerificationKey, Signature},
    registry::OciReference,
};
use webpki::{EndEntityCert, KeyUsage};
use x509_cert::{der::Decode, Certificate};

use super::{auth::RegistryCredentials, ImageReference, ImageVerifier, VerifiedSignature};
use crate::trust::TrustBundle;

pub const SIMPLE_SIGNING_MEDIA_TYPE: &str = "application/vnd.dev.cosign.simplesigning.v1+json";
pub const SIGNATURE_ANNOTATION: &str = "dev.cosignproject.cosign/signature";
pub const CERTIFICATE_ANNOTATION: &str = "dev.sigstore.cosign/certificate";
pub const CHAIN_ANNOTATION: &str = "dev.sigstore.cosign/chain";

/// id-kp-codeSigning (1.3.6.1.5.5.7.3.3), DER encoded without tag and length.
const CODE_SIGNING_EKU: &[u8] = &[0x2b, 0x06, 0x01, 0x05, 0x05, 0x07, 0x03, 0x03];

const CERTIFICATE_TAG: &str = "CERTIFICATE";

/// Checks cosign signatures of images, trusting signing certificates issued
/// under the roots of the trust bundle.
pub struct CosignVerifier {
    client: Client,
    credentials: RegistryCredentials,
}

impl CosignVerifier {
    pub fn new(credentials: RegistryCredentials) -> Self {
        Self {
            client: Client::default(),
            credentials,
        }
    }

    /// Verifier pulling signatures without registry credentials.
    pub fn anonymous() -> Self {
        Self::new(RegistryCredentials::Anonymous)
    }
}

#[async_trait]
impl ImageVerifier for CosignVerifier {
    fn parse_reference(&self, identifier: &str) -> Result<ImageReference> {
        OciReference::from_str(identifier)?;
        Ok(ImageReference::new(identifier))
    }

    /// There will be three steps:
    /// * Resolve the manifest digest of the image.
    /// * Pull the cosign signature image tagged after that digest.
    /// * Keep the layers whose certificate chains to `trust` and whose
    ///   signature verifies under that certificate.
    async fn verify_image_signatures(
        &self,
        reference: &ImageReference,
        trust: &TrustBundle,
    ) -> Result<Vec<VerifiedSignature>> {
        let image = Reference::from_str(reference.as_str())?;
        let auth = self.credentials.credential_for_reference(&image)?;

        let image_digest = self
            .client
            .fetch_manifest_digest(&image, &auth)
            .await
            .context("resolve image manifest digest")?;
        let signature_image = signature_image(&image, &image_digest);
        debug!(
            "{} resolved to manifest {image_digest}, signatures in {}",
            reference.as_str(),
            signature_image.whole()
        );

        let signatures = self
            .client
            .pull(&signature_image, &auth, vec![SIMPLE_SIGNING_MEDIA_TYPE])
            .await
            .context("pull signature image")?;

        let total = signatures.layers.len();
        let verified = verified_signatures(&signatures.layers, &image_digest, trust);
        debug!(
            "{} of {total} signature layer(s) of {} verified",
            verified.len(),
            reference.as_str()
        );

        Ok(verified)
    }
}

/// Reference of the cosign signature image of the manifest `digest`.
fn signature_image(image: &Reference, digest: &str) -> Reference {
    Reference::with_tag(
        image.registry().to_string(),
        image.repository().to_string(),
        format!("{}.sig", digest.replace(':', "-")),
    )
}

fn trust_anchors(trust: &TrustBundle) -> Vec<TrustAnchor<'static>> {
    trust
        .certificates()
        .iter()
        .filter_map(|der| {
            let der = CertificateDer::from(der.as_slice());
            match webpki::anchor_from_trusted_cert(&der) {
                Ok(anchor) => Some(anchor.to_owned()),
                Err(e) => {
                    warn!("skip unusable trust bundle certificate: {e}");
                    None
                }
            }
        })
        .collect()
}

/// The layers of a signature image that pass [`verify_layer`]. Rejected
/// layers are logged with the reason.
pub fn verified_signatures(
    layers: &[ImageLayer],
    image_digest: &str,
    trust: &TrustBundle,
) -> Vec<VerifiedSignature> {
    let roots = trust_anchors(trust);
    layers
        .iter()
        .filter_map(|layer| match verify_layer(layer, image_digest, &roots) {
            Ok(signature) => Some(signature),
            Err(e) => {
                info!(
                    "ignore signature layer {}: {e:#}",
                    layer.sha256_digest()
                );
                None
            }
        })
        .collect()
}

/// A layer is trusted when its payload is about `image_digest`, its
/// certificate is valid for code signing under one of `roots`, and its
/// signature verifies the payload under the certificate's key.
fn verify_layer(
    layer: &ImageLayer,
    image_digest: &str,
    roots: &[TrustAnchor<'_>],
) -> Result<VerifiedSignature> {
    if layer.media_type != SIMPLE_SIGNING_MEDIA_TYPE {
        bail!("unexpected media type {}", layer.media_type);
    }

    let payload: SimpleSigning =
        serde_json::from_slice(&layer.data).context("illegal simple signing payload")?;
    if !payload.satisfies_manifest_digest(image_digest) {
        bail!(
            "payload signs {} instead of {image_digest}",
            payload.critical.image.docker_manifest_digest
        );
    }

    let empty = BTreeMap::new();
    let annotations = layer.annotations.as_ref().unwrap_or(&empty);
    let signature = annotations
        .get(SIGNATURE_ANNOTATION)
        .ok_or_else(|| anyhow!("no signature annotation"))?;
    let certificate = annotations
        .get(CERTIFICATE_ANNOTATION)
        .ok_or_else(|| anyhow!("no certificate annotation"))?;

    let certificate = pem::parse(certificate).context("illegal certificate PEM")?;
    if certificate.tag() != CERTIFICATE_TAG {
        bail!("certificate annotation holds a {} block", certificate.tag());
    }
    let intermediates = match annotations.get(CHAIN_ANNOTATION) {
        Some(chain) => pem::parse_many(chain)
            .context("illegal chain PEM")?
            .into_iter()
            .filter(|block| block.tag() == CERTIFICATE_TAG)
            .map(|block| CertificateDer::from(block.into_contents()))
            .collect(),
        None => Vec::new(),
    };

    // Signing certificates are short lived, the chain is checked at the
    // start of their validity.
    let parsed = Certificate::from_der(certificate.contents())
        .map_err(|e| anyhow!("illegal certificate: {e}"))?;
    let issued_at = UnixTime::since_unix_epoch(
        parsed
            .tbs_certificate
            .validity
            .not_before
            .to_unix_duration(),
    );

    let der = CertificateDer::from(certificate.contents());
    let end_entity =
        EndEntityCert::try_from(&der).map_err(|e| anyhow!("illegal certificate: {e}"))?;
    end_entity
        .verify_for_usage(
            webpki::ALL_VERIFICATION_ALGS,
            roots,
            &intermediates,
            issued_at,
            KeyUsage::required(CODE_SIGNING_EKU),
            None,
            None,
        )
        .map_err(|e| anyhow!("certificate does not chain to the trust bundle: {e}"))?;

    let key = CosignVerificationKey::try_from(&parsed.tbs_certificate.subject_public_key_info)
        .context("unsupported certificate key")?;
    key.verify_signature(Signature::Base64Encoded(signature.as_bytes()), &layer.data)
        .context("signature does not match payload")?;

    Ok(VerifiedSignature {
        layer_digest: layer.sha256_digest(),
        image_digest: payload.critical.image.docker_manifest_digest,
    })
}

#[cfg(test)]
mod tests {
    use std::fs;

    use rstest::rstest;

    use super::*;

    const IMAGE_DIGEST: &str =
        "sha256:4b825dc642cb6eb9a060e54bf8d69288fbee4904b1f4a5b8c2b3a5a3c9ad4e66";

    fn test_data(name: &str) -> String {
        let path = format!(
            "{}/test_data/cosign/{name}",
            env!("CARGO_MANIFEST_DIR")
        );
        fs::read_to_string(&path).unwrap_or_else(|e| panic!("read {path}: {e}"))
    }

    fn bundle(names: &[&str]) -> TrustBundle {
        let chain: String = names.iter().map(|name| test_data(name)).collect();
        TrustBundle::from_pem(chain.as_bytes()).unwrap()
    }

    /// Layer as cosign writes it for the signing certificate `leaf.pem`.
    fn signed_layer() -> ImageLayer {
        let mut annotations = BTreeMap::new();
        annotations.insert(
            SIGNATURE_ANNOTATION.to_string(),
            test_data("payload.sig").trim().to_string(),
        );
        annotations.insert(CERTIFICATE_ANNOTATION.to_string(), test_data("leaf.pem"));
        annotations.insert(CHAIN_ANNOTATION.to_string(), test_data("intermediate.pem"));
        ImageLayer::new(
            test_data("payload.json").into_bytes(),
            SIMPLE_SIGNING_MEDIA_TYPE.to_string(),
            Some(annotations),
        )
    }

    fn annotate(mut layer: ImageLayer, key: &str, value: Option<String>) -> ImageLayer {
        let annotations = layer.annotations.get_or_insert_with(BTreeMap::new);
        match value {
            Some(value) => annotations.insert(key.to_string(), value),
            None => annotations.remove(key),
        };
        layer
    }

    #[test]
    fn certificate_signed_layer_verified() {
        let layer = signed_layer();
        let verified = verified_signatures(&[layer.clone()], IMAGE_DIGEST, &bundle(&["root.pem"]));
        assert_eq!(
            verified,
            vec![VerifiedSignature {
                layer_digest: layer.sha256_digest(),
                image_digest: IMAGE_DIGEST.into(),
            }]
        );
    }

    #[test]
    fn intermediate_from_trust_bundle() {
        let layer = annotate(signed_layer(), CHAIN_ANNOTATION, None);
        let verified = verified_signatures(
            &[layer],
            IMAGE_DIGEST,
            &bundle(&["root.pem", "intermediate.pem"]),
        );
        assert_eq!(verified.len(), 1);
    }

    #[rstest]
    #[case::no_certificate(annotate(signed_layer(), CERTIFICATE_ANNOTATION, None))]
    #[case::no_signature(annotate(signed_layer(), SIGNATURE_ANNOTATION, None))]
    #[case::no_annotations(ImageLayer::new(
        test_data("payload.json").into_bytes(),
        SIMPLE_SIGNING_MEDIA_TYPE.to_string(),
        None,
    ))]
    #[case::missing_intermediate(annotate(signed_layer(), CHAIN_ANNOTATION, None))]
    #[case::not_for_code_signing(annotate(
        signed_layer(),
        CERTIFICATE_ANNOTATION,
        Some(test_data("leaf-server-auth.pem")),
    ))]
    #[case::certificate_is_not_a_certificate(annotate(
        signed_layer(),
        CERTIFICATE_ANNOTATION,
        Some(test_data("root.pem").replace("CERTIFICATE", "PUBLIC KEY")),
    ))]
    #[case::signature_of_other_payload(annotate(
        signed_layer(),
        SIGNATURE_ANNOTATION,
        Some("MEUCIQD6q/COgzOyW0YH1Dk+CCYSt4uAhm3FDHUwvPI55zwnlwIgE0ZK58ZOWpZw8YVmBapJhBqCfdPekIknimuO0xH8Jh8=".into()),
    ))]
    #[case::signature_not_base64(annotate(
        signed_layer(),
        SIGNATURE_ANNOTATION,
        Some("not a signature".into()),
    ))]
    #[case::forged_payload(ImageLayer {
        data: test_data("payload.json")
            .replace("registry.example.com/app", "registry.example.com/evil")
            .into_bytes(),
        ..signed_layer()
    })]
    #[case::other_media_type(ImageLayer {
        media_type: "application/vnd.oci.image.layer.v1.tar".into(),
        ..signed_layer()
    })]
    fn untrusted_layer_rejected(#[case] layer: ImageLayer) {
        let verified = verified_signatures(&[layer], IMAGE_DIGEST, &bundle(&["root.pem"]));
        assert!(verified.is_empty());
    }

    #[test]
    fn other_root_rejected() {
        let verified =
            verified_signatures(&[signed_layer()], IMAGE_DIGEST, &bundle(&["other-root.pem"]));
        assert!(verified.is_empty());
    }

    #[test]
    fn signature_for_other_image_rejected() {
        let other = "sha256:0000000000000000000000000000000000000000000000000000000000000000";
        let verified = verified_signatures(&[signed_layer()], other, &bundle(&["root.pem"]));
        assert!(verified.is_empty());
    }

    #[test]
    fn only_trusted_layers_kept() {
        let layers = [
            annotate(signed_layer(), CERTIFICATE_ANNOTATION, None),
            signed_layer(),
            annotate(signed_layer(), SIGNATURE_ANNOTATION, Some("AAAA".into())),
        ];
        let verified = verified_signatures(&layers, IMAGE_DIGEST, &bundle(&["root.pem"]));
        assert_eq!(verified.len(), 1);
        assert_eq!(verified[0].layer_digest, signed_layer().sha256_digest());
    }

    #[rstest]
    #[case(
        "quay.io/kata-containers/confidential-containers:cosign-signed",
        "quay.io/kata-containers/confidential-containers:sha256-abc.sig"
    )]
    #[case("busybox", "docker.io/library/busybox:sha256-abc.sig")]
    #[case(
        "registry.example.com/app@sha256:4b825dc642cb6eb9a060e54bf8d69288fbee4904b1f4a5b8c2b3a5a3c9ad4e66",
        "registry.example.com/app:sha256-abc.sig"
    )]
    fn signature_image_tag(#[case] image: &str, #[case] expected: &str) {
        let image = Reference::from_str(image).unwrap();
        assert_eq!(signature_image(&image, "sha256:abc").whole(), expected);
    }

    #[rstest]
    #[case("quay.io/kata-containers/confidential-containers:cosign-signed")]
    #[case("ghcr.io/confidential-containers/test-container-image-rs:cosign-signed")]
    #[case("busybox")]
    #[case(
        "docker.io/library/busybox@sha256:7bd0c945d7e4cc2ce5c21d449ba07eb89c8e6c28085edbcf6f5fa4bf90e7eedc"
    )]
    fn parse_valid_reference(#[case] identifier: &str) {
        let verifier = CosignVerifier::anonymous();
        let reference = verifier
            .parse_reference(identifier)
            .expect("reference should parse");
        assert_eq!(reference.as_str(), identifier);
    }

    #[rstest]
    #[case("")]
    #[case("docker.io/UPPER/case:latest")]
    #[case("not a reference")]
    fn parse_invalid_reference(#[case] identifier: &str) {
        let verifier = CosignVerifier::anonymous();
        assert!(verifier.parse_reference(identifier).is_err());
    }
}
