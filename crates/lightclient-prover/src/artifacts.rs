//! Compiled circuit and keys on disk. A complete set of files is loaded as is, anything less is
//! regenerated and overwritten.

use ark_groth16::{ProvingKey, VerifyingKey};
use ark_relations::r1cs::SynthesisError;
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize, SerializationError};
use lightclient_snark::{trusted_setup, BWCurve, CompiledCircuit, Parameters};
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("{path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        source: SerializationError,
    },
    #[error("artifacts do not belong together: {0}")]
    Mismatch(&'static str),
    #[error("setup failed: {0}")]
    Setup(#[from] SynthesisError),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactPaths {
    pub circuit: PathBuf,
    pub proving_key: PathBuf,
    pub verifying_key: PathBuf,
}

impl ArtifactPaths {
    /// `circuit.bin`, `proving.key` and `verifying.key` under `dir`
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            circuit: dir.join("circuit.bin"),
            proving_key: dir.join("proving.key"),
            verifying_key: dir.join("verifying.key"),
        }
    }

    fn all(&self) -> [&Path; 3] {
        [&self.circuit, &self.proving_key, &self.verifying_key]
    }
}

/// Everything needed to prove and verify, immutable once loaded
#[derive(Clone, Debug)]
pub struct Artifacts {
    pub parameters: Parameters,
}

impl Artifacts {
    pub fn new(parameters: Parameters) -> Self {
        Self { parameters }
    }

    pub fn verifying_key(&self) -> &VerifyingKey<BWCurve> {
        self.parameters.verifying_key()
    }

    /// Loads the transition circuit artifacts for `capacity` validators, running the setup if
    /// any of them is missing
    pub fn load_or_compile<R: RngCore + CryptoRng>(
        paths: &ArtifactPaths,
        capacity: usize,
        rng: &mut R,
    ) -> Result<Self, ArtifactError> {
        Self::load_or_else(paths, || trusted_setup(capacity, rng))
    }

    /// Loads the artifacts if all of them exist, otherwise generates them with `setup` and
    /// writes them out
    pub fn load_or_else<F>(paths: &ArtifactPaths, setup: F) -> Result<Self, ArtifactError>
    where
        F: FnOnce() -> Result<Parameters, SynthesisError>,
    {
        let present = paths.all().iter().filter(|path| path.is_file()).count();
        if present == 3 {
            info!("Loading artifacts");
            return Self::load(paths);
        }
        if present > 0 {
            warn!("{} of 3 artifacts present, regenerating all of them", present);
        }

        info!("Generating artifacts");
        let artifacts = Self::new(setup()?);
        artifacts.save(paths)?;
        Ok(artifacts)
    }

    pub fn load(paths: &ArtifactPaths) -> Result<Self, ArtifactError> {
        let circuit: CompiledCircuit = read(&paths.circuit, |r| {
            CompiledCircuit::deserialize_compressed(r)
        })?;
        // the proving key is trusted local data, skipping the subgroup checks saves minutes
        let proving_key: ProvingKey<BWCurve> = read(&paths.proving_key, |r| {
            ProvingKey::deserialize_uncompressed_unchecked(r)
        })?;
        let verifying_key: VerifyingKey<BWCurve> = read(&paths.verifying_key, |r| {
            VerifyingKey::deserialize_compressed(r)
        })?;

        if proving_key.vk != verifying_key {
            return Err(ArtifactError::Mismatch("verifying key"));
        }
        if verifying_key.gamma_abc_g1.len() != circuit.num_instance_variables() {
            return Err(ArtifactError::Mismatch("public inputs"));
        }
        Ok(Self::new(Parameters {
            circuit,
            proving_key,
        }))
    }

    pub fn save(&self, paths: &ArtifactPaths) -> Result<(), ArtifactError> {
        let params = &self.parameters;
        write(&paths.circuit, |w| params.circuit.serialize_compressed(w))?;
        write(&paths.proving_key, |w| {
            params.proving_key.serialize_uncompressed(w)
        })?;
        write(&paths.verifying_key, |w| {
            params.verifying_key().serialize_compressed(w)
        })?;
        info!("Artifacts written");
        Ok(())
    }
}

fn read<T, F>(path: &Path, f: F) -> Result<T, ArtifactError>
where
    F: FnOnce(&mut BufReader<File>) -> Result<T, SerializationError>,
{
    let file = File::open(path).map_err(|source| ArtifactError::Io {
        path: path.to_owned(),
        source,
    })?;
    let mut reader = BufReader::new(file);
    f(&mut reader).map_err(|source| ArtifactError::Corrupt {
        path: path.to_owned(),
        source,
    })
}

fn write<F>(path: &Path, f: F) -> Result<(), ArtifactError>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<(), SerializationError>,
{
    let io_error = |source| ArtifactError::Io {
        path: path.to_owned(),
        source,
    };
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(io_error)?;
    }
    let mut writer = BufWriter::new(File::create(path).map_err(io_error)?);
    f(&mut writer).map_err(|source| match source {
        SerializationError::IoError(source) => io_error(source),
        source => ArtifactError::Corrupt {
            path: path.to_owned(),
            source,
        },
    })?;
    writer.flush().map_err(io_error)
}
