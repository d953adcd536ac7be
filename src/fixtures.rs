use anyhow::Result;

use crate::config::Config;
use crate::xrd::ResourceDefinition;

/// A modern namespaced definition with a flat schema.
pub const MODERN_NAMESPACED: &str = r#"
apiVersion: apiextensions.crossplane.io/v2
kind: CompositeResourceDefinition
metadata:
  name: xdatabases.platform.example.org
  annotations:
    crossplane.backstage.io/docs-url: https://docs.example.org/databases
    crossplane.backstage.io/tags: databases, Storage
spec:
  group: platform.example.org
  scope: Namespaced
  names:
    kind: XDatabase
    plural: xdatabases
  defaultCompositionRef:
    name: aws-postgres
  versions:
    - name: v1alpha1
      served: true
      referenceable: true
      schema:
        openAPIV3Schema:
          type: object
          properties:
            spec:
              type: object
              description: Desired database settings.
              required: [engine]
              properties:
                engine:
                  type: string
                  description: The database engine.
                  enum: [postgres, mysql]
                  default: postgres
                storage:
                  type: integer
                  description: Storage size in GiB.
                  minimum: 10
                  maximum: 1000
                  default: 20
"#;

/// A legacy definition offering the `FooClaim` claim.
pub const LEGACY_CLAIM: &str = r#"
apiVersion: apiextensions.crossplane.io/v1
kind: CompositeResourceDefinition
metadata:
  name: xfoos.example.org
spec:
  group: example.org
  names:
    kind: XFoo
    plural: xfoos
  claimNames:
    kind: FooClaim
    plural: fooclaims
  defaultCompositionRef:
    name: foo-default
  versions:
    - name: v1
      served: true
      referenceable: true
      schema:
        openAPIV3Schema:
          type: object
          properties:
            spec:
              type: object
              properties:
                size:
                  type: string
                  default: small
"#;

/// A modern definition in legacy-compatibility scope which declares claim names.
pub const LEGACY_CLUSTER_CLAIM: &str = r#"
apiVersion: apiextensions.crossplane.io/v2
kind: CompositeResourceDefinition
metadata:
  name: xbuckets.storage.example.org
spec:
  group: storage.example.org
  scope: LegacyCluster
  names:
    kind: XBucket
    plural: xbuckets
  claimNames:
    kind: Bucket
    plural: buckets
  versions:
    - name: v1beta1
      served: true
      referenceable: true
      schema:
        openAPIV3Schema:
          type: object
          properties:
            spec:
              type: object
              properties:
                region:
                  type: string
"#;

/// A definition without any served version.
pub const NOTHING_SERVED: &str = r#"
apiVersion: apiextensions.crossplane.io/v1
kind: CompositeResourceDefinition
metadata:
  name: xqueues.example.org
spec:
  group: example.org
  names:
    kind: XQueue
    plural: xqueues
  claimNames:
    kind: Queue
    plural: queues
  versions:
    - name: v1alpha1
      served: false
      referenceable: false
      schema:
        openAPIV3Schema:
          type: object
"#;

/// A modern cluster scoped definition targeting three clusters.
pub const MULTI_CLUSTER: &str = r#"
apiVersion: apiextensions.crossplane.io/v2
kind: CompositeResourceDefinition
metadata:
  name: xnetworks.net.example.org
spec:
  group: net.example.org
  scope: Cluster
  names:
    kind: XNetwork
    plural: xnetworks
  versions:
    - name: v1
      served: true
      referenceable: true
      schema:
        openAPIV3Schema:
          type: object
          properties:
            spec:
              type: object
              properties:
                cidr:
                  type: string
                  pattern: '^[0-9./]+$'
clusters: [dev, staging, prod]
clusterName: hub
"#;

/// A definition with three versions, one of which is not served.
pub const MULTI_VERSION: &str = r#"
apiVersion: apiextensions.crossplane.io/v2
kind: CompositeResourceDefinition
metadata:
  name: xcaches.platform.example.org
spec:
  group: platform.example.org
  scope: Namespaced
  names:
    kind: XCache
    plural: xcaches
  versions:
    - name: v1alpha1
      served: true
      deprecated: true
      referenceable: false
      schema:
        openAPIV3Schema:
          type: object
          properties:
            spec:
              type: object
              properties:
                nodes:
                  type: integer
    - name: v1beta1
      served: false
      referenceable: false
      schema:
        openAPIV3Schema:
          type: object
          properties:
            spec:
              type: object
              properties:
                nodes:
                  type: integer
    - name: v1
      served: true
      referenceable: true
      schema:
        openAPIV3Schema:
          type: object
          properties:
            spec:
              type: object
              properties:
                nodes:
                  type: integer
                  minimum: 1
                evictionPolicy:
                  type: string
                  enum: [lru, lfu]
                  x-enum-labels: [Least Recently Used, Least Frequently Used]
"#;

/// A definition with objects nested two levels deep, and an array of objects.
pub const NESTED: &str = r#"
apiVersion: apiextensions.crossplane.io/v2
kind: CompositeResourceDefinition
metadata:
  name: xclusters.compute.example.org
spec:
  group: compute.example.org
  scope: Namespaced
  names:
    kind: XCluster
    plural: xclusters
  versions:
    - name: v1
      served: true
      referenceable: true
      schema:
        openAPIV3Schema:
          type: object
          properties:
            spec:
              type: object
              required: [nodePool]
              properties:
                nodePool:
                  type: object
                  required: [size]
                  properties:
                    size:
                      type: integer
                      default: 3
                    machineType:
                      type: string
                      default: "{{ xrName }}-pool"
                    autoscaling:
                      type: object
                      properties:
                        enabled:
                          type: boolean
                endpoints:
                  type: array
                  items:
                    type: object
                    required: [host, tls]
                    properties:
                      host:
                        type: string
                      port:
                        type: integer
                      tls:
                        type: object
                        properties:
                          secretName:
                            type: string
                labels:
                  type: array
                  items:
                    type: string
                displayName:
                  type: string
                  default: "{{ xrName }}"
"#;

/// A definition whose fields are declared out of alphabetical order, with kebab-case keys.
pub const ORDERED: &str = r#"
apiVersion: apiextensions.crossplane.io/v2
kind: CompositeResourceDefinition
metadata:
  name: xqueues.messaging.example.org
spec:
  group: messaging.example.org
  scope: Namespaced
  names:
    kind: XQueue
    plural: xqueues
  versions:
    - name: v1
      served: true
      referenceable: true
      schema:
        openAPIV3Schema:
          type: object
          properties:
            spec:
              type: object
              required: [size, engine]
              properties:
                size:
                  type: string
                  default: small
                engine:
                  type: string
                  enum: [rabbitmq, nats]
                max-replicas:
                  type: integer
                  default: 3
                retention:
                  type: object
                  properties:
                    max-age:
                      type: string
                    bytes:
                      type: integer
"#;

/// A publishing configuration with every publish phase target.
pub const PUBLISHING_CONFIG: &str = r#"
annotationPrefix: crossplane.backstage.io
defaultOwner: group:default/platform-team
templateOwner: group:default/platform-team
additionalTags: [self-service]
includeFetchAction: true
includeRegisterAction: true
publishEnabled: true
publishPhase:
  git:
    repoUrl: github.com?owner=example&repo=gitops
    branch: main
    basePath: manifests
  reconcile:
    name: platform
    namespace: flux-system
  sync:
    application: platform
    server: argocd.example.org
"#;

/// Parse the given fixture into a definition.
pub fn definition(yaml: &str) -> Result<ResourceDefinition> {
    ResourceDefinition::from_yaml(yaml)
}

/// Parse the publishing configuration fixture.
pub fn publishing_config() -> Result<Config> {
    Config::from_yaml(PUBLISHING_CONFIG)
}

/// Every definition fixture which transforms successfully.
pub fn transformable() -> Result<Vec<ResourceDefinition>> {
    [MODERN_NAMESPACED, LEGACY_CLAIM, LEGACY_CLUSTER_CLAIM, MULTI_CLUSTER, MULTI_VERSION, NESTED, ORDERED]
        .iter()
        .map(|yaml| definition(yaml))
        .collect()
}
